use std::io::Cursor;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use bytes::Bytes;
use gallery_access::membership::authorize;
use gallery_access::session::Authenticated;
use gallery_access::{AccessError, Operation};
use gallery_storage::image_key;
use gallery_types::api::{MessageResponse, UploadResponse};
use gallery_types::validate::validate_file_name;
use image::ImageReader;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{AppState, blocking};
use crate::views;

/// Multipart field carrying the uploaded images.
const FILES_FIELD: &str = "files";

struct Upload {
    file_name: String,
    data: Bytes,
}

/// Read the `files` fields. Each file name is checked from the part headers
/// before its bytes are buffered.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILES_FIELD) {
            return Err(ApiError::BadRequest(format!(
                "Unexpected field, images go in '{FILES_FIELD}'"
            )));
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Every file needs a file name".into()))?;
        check_file_name(&file_name)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        uploads.push(Upload { file_name, data });
    }
    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".into()));
    }
    Ok(uploads)
}

fn check_file_name(file_name: &str) -> Result<(), ApiError> {
    validate_file_name(file_name).map_err(|e| {
        ApiError::BadRequest(
            e.message
                .map(|m| format!("{file_name}: {m}"))
                .unwrap_or_else(|| "Invalid file name".into()),
        )
    })
}

fn image_dimensions(file_name: &str, data: &[u8]) -> Result<(u32, u32), ApiError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("{file_name} is not a readable image")))
}

/// POST /api/gallery/{gallery_id}/images
///
/// The caller is authorized before the body is read. Every file name is
/// checked before any image is stored. Files are then stored one at a time;
/// the first name collision fails the request and files stored before it
/// stay.
pub async fn upload_images(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = auth.account.id;
    let gallery = blocking(&state, move |db| {
        authorize(db, account_id, gallery_id, Operation::UploadImage)?;
        db.get_gallery(gallery_id)?.ok_or(AccessError::NotMember)
    })
    .await?;

    let uploads = read_uploads(multipart).await?;

    let mut stored = Vec::with_capacity(uploads.len());
    for Upload { file_name, data } in uploads {
        let name = file_name.clone();
        let taken = blocking(&state, move |db| db.image_name_taken(gallery_id, &name)).await?;
        if taken {
            return Err(ApiError::Conflict(format!(
                "An image named {file_name} already exists in this gallery"
            )));
        }

        let (width, height) = image_dimensions(&file_name, &data)?;
        let size = data.len() as u64;
        state.blobs.put(&image_key(gallery.uuid, &file_name), data).await?;

        let row = blocking(&state, move |db| {
            db.insert_image(gallery_id, &file_name, width, height, size)
        })
        .await?;
        debug!("Stored image {} in gallery {}", row.file_name, gallery_id);
        stored.push(views::image(row, gallery.uuid));
    }

    info!("Uploaded {} images to gallery {}", stored.len(), gallery_id);
    Ok((StatusCode::CREATED, Json(UploadResponse { images: stored })))
}

/// DELETE /api/gallery/{gallery_id}/image/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path((gallery_id, image_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    let (gallery, image) = blocking(&state, move |db| {
        authorize(db, account_id, gallery_id, Operation::DeleteImage)?;
        let gallery = db.get_gallery(gallery_id)?.ok_or(AccessError::NotMember)?;
        let image = db
            .get_image_in_gallery(gallery_id, image_id)?
            .ok_or(AccessError::ImageNotFound)?;
        Ok::<_, AccessError>((gallery, image))
    })
    .await?;

    state
        .blobs
        .delete(&image_key(gallery.uuid, &image.file_name))
        .await?;
    blocking(&state, move |db| db.delete_image(image.id)).await?;

    info!("Deleted image {} from gallery {}", image_id, gallery_id);
    Ok(Json(MessageResponse::new("Image deleted successfully")))
}
