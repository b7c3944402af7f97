//! Endpoints for anonymous visitors holding an access key. The key in the
//! path is the only credential.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use gallery_access::access_key::{image_for_key, require_download, resolve_access_key};
use gallery_access::{AccessError, collections};
use gallery_storage::{StorageError, image_key};
use gallery_types::api::{
    AccessGalleryView, AddToCollectionRequest, CollectionContents, MessageResponse, SharedGallery,
    SharedImage,
};
use image::ImageFormat;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::{AppState, blocking};
use crate::views;

/// GET /api/access/{access_key}
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<AccessGalleryView>, ApiError> {
    let (key, gallery, images, collection_rows, mut visible) = blocking(&state, move |db| {
        let key = resolve_access_key(db, &token)?;
        let gallery = db
            .get_gallery(key.gallery_id)?
            .ok_or(AccessError::AccessKeyNotFound)?;
        let images = db.list_images(gallery.id)?;
        let collection_rows = db.list_collections(gallery.id)?;
        let visible = collections::collection_ids_for_key(db, &key)?;
        Ok::<_, AccessError>((key, gallery, images, collection_rows, visible))
    })
    .await?;

    let images = images
        .into_iter()
        .map(|row| SharedImage {
            key: image_key(gallery.uuid, &row.file_name),
            collection_ids: visible.remove(&row.id).unwrap_or_default(),
            id: row.id,
            file_name: row.file_name,
            width: row.width,
            height: row.height,
        })
        .collect();

    Ok(Json(AccessGalleryView {
        can_download: key.can_download,
        can_use_collections: key.can_use_collections,
        gallery: SharedGallery {
            id: gallery.id,
            name: gallery.name,
            description: gallery.description,
        },
        images,
        collections: collection_rows
            .into_iter()
            .map(views::shared_collection)
            .collect(),
    }))
}

/// GET /api/access/{access_key}/collection/{collection_id}
pub async fn get_collection(
    State(state): State<AppState>,
    Path((token, collection_id)): Path<(String, i64)>,
) -> Result<Json<CollectionContents>, ApiError> {
    let (collection, gallery, images) = blocking(&state, move |db| {
        let (collection, images) = collections::contents_for_key(db, &token, collection_id)?;
        let gallery = db
            .get_gallery(collection.gallery_id)?
            .ok_or(AccessError::CollectionNotFound)?;
        Ok::<_, AccessError>((collection, gallery, images))
    })
    .await?;

    Ok(Json(CollectionContents {
        id: collection.id,
        name: collection.name,
        is_shared: collection.is_shared,
        images: views::images(images, gallery.uuid),
    }))
}

/// POST /api/access/{access_key}/collection/{collection_id}
pub async fn add_to_collection(
    State(state): State<AppState>,
    Path((token, collection_id)): Path<(String, i64)>,
    ValidJson(req): ValidJson<AddToCollectionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |db| {
        collections::add_image(db, &token, collection_id, req.image_id)
    })
    .await?;
    Ok(Json(MessageResponse::new(
        "Image added to collection successfully",
    )))
}

/// DELETE /api/access/{access_key}/collection/{collection_id}/image/{image_id}
pub async fn remove_from_collection(
    State(state): State<AppState>,
    Path((token, collection_id, image_id)): Path<(String, i64, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |db| {
        collections::remove_image(db, &token, collection_id, image_id)
    })
    .await?;
    Ok(Json(MessageResponse::new(
        "Image removed from collection successfully",
    )))
}

/// GET /api/access/{access_key}/image/{image_id}/download
pub async fn download_image(
    State(state): State<AppState>,
    Path((token, image_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let (gallery, image) = blocking(&state, move |db| {
        let key = resolve_access_key(db, &token)?;
        require_download(&key)?;
        let image = image_for_key(db, &key, image_id)?;
        let gallery = db
            .get_gallery(key.gallery_id)?
            .ok_or(AccessError::ImageNotFound)?;
        Ok::<_, AccessError>((gallery, image))
    })
    .await?;

    let data = state
        .blobs
        .get(&image_key(gallery.uuid, &image.file_name))
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::NotFound("Image not found".into()),
            other => other.into(),
        })?;

    let content_type = ImageFormat::from_path(&image.file_name)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    debug!("Serving image {} ({} bytes)", image.id, data.len());

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", image.file_name),
            ),
        ],
        data,
    ))
}
