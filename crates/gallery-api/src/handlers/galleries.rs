use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use gallery_access::membership::{self, authorize};
use gallery_access::session::Authenticated;
use gallery_access::{AccessError, Operation};
use gallery_storage::gallery_prefix;
use gallery_types::api::{
    CreateGalleryRequest, GalleryDetails, GallerySummary, MessageResponse, UpdateGalleryRequest,
};
use tracing::{error, info};

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::{AppState, blocking};
use crate::views;

/// POST /api/gallery
pub async fn create_gallery(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    ValidJson(req): ValidJson<CreateGalleryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = auth.account.id;
    let gallery = blocking(&state, move |db| {
        membership::create_gallery(db, account_id, &req.name, Some(req.description.as_str()))
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(views::gallery_summary(gallery, gallery_types::models::Role::Owner)),
    ))
}

/// GET /api/gallery
pub async fn list_galleries(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<Vec<GallerySummary>>, ApiError> {
    let account_id = auth.account.id;
    let galleries = blocking(&state, move |db| db.list_galleries_for_account(account_id)).await?;
    Ok(Json(
        galleries
            .into_iter()
            .map(|(gallery, role)| views::gallery_summary(gallery, role))
            .collect(),
    ))
}

/// GET /api/gallery/{gallery_id}
pub async fn get_gallery(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
) -> Result<Json<GalleryDetails>, ApiError> {
    let account_id = auth.account.id;
    let (role, gallery, images, collections) = blocking(&state, move |db| {
        let role = authorize(db, account_id, gallery_id, Operation::ViewGallery)?;
        let gallery = db.get_gallery(gallery_id)?.ok_or(AccessError::NotMember)?;
        let images = db.list_images(gallery_id)?;
        let collections = db.list_collections(gallery_id)?;
        Ok::<_, AccessError>((role, gallery, images, collections))
    })
    .await?;

    Ok(Json(GalleryDetails {
        id: gallery.id,
        uuid: gallery.uuid,
        name: gallery.name,
        description: gallery.description,
        access_level: role,
        images: views::images(images, gallery.uuid),
        collections: collections.into_iter().map(views::collection).collect(),
    }))
}

/// PATCH /api/gallery/{gallery_id}
pub async fn update_gallery(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
    ValidJson(req): ValidJson<UpdateGalleryRequest>,
) -> Result<Json<GallerySummary>, ApiError> {
    let account_id = auth.account.id;
    let (gallery, role) = blocking(&state, move |db| {
        let role = authorize(db, account_id, gallery_id, Operation::UpdateGallery)?;
        let gallery = db
            .update_gallery(gallery_id, req.name.as_deref(), req.description.as_deref())?
            .ok_or(AccessError::NotMember)?;
        Ok::<_, AccessError>((gallery, role))
    })
    .await?;
    Ok(Json(views::gallery_summary(gallery, role)))
}

/// DELETE /api/gallery/{gallery_id}
///
/// Rows go first (cascading to everything in the gallery), then the blobs.
pub async fn delete_gallery(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    let gallery = blocking(&state, move |db| {
        authorize(db, account_id, gallery_id, Operation::DeleteGallery)?;
        let gallery = db.get_gallery(gallery_id)?.ok_or(AccessError::NotMember)?;
        db.delete_gallery(gallery_id)?;
        Ok::<_, AccessError>(gallery)
    })
    .await?;

    if let Err(e) = state.blobs.delete_by_prefix(&gallery_prefix(gallery.uuid)).await {
        error!("Gallery {} deleted but its blobs remain: {}", gallery.id, e);
    }
    info!("Account {} deleted gallery {}", account_id, gallery.id);
    Ok(Json(MessageResponse::new("Gallery deleted successfully")))
}
