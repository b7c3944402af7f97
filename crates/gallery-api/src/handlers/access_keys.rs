use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use gallery_access::access_key;
use gallery_access::session::Authenticated;
use gallery_types::api::{AccessKeyResponse, CreateAccessKeyRequest, MessageResponse};

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::{AppState, blocking};
use crate::views;

/// GET /api/gallery/{gallery_id}/access-keys
pub async fn list_access_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
) -> Result<Json<Vec<AccessKeyResponse>>, ApiError> {
    let account_id = auth.account.id;
    let keys = blocking(&state, move |db| {
        access_key::list_access_keys(db, account_id, gallery_id)
    })
    .await?;
    Ok(Json(keys.into_iter().map(views::access_key).collect()))
}

/// POST /api/gallery/{gallery_id}/access-key
pub async fn create_access_key(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
    ValidJson(req): ValidJson<CreateAccessKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = auth.account.id;
    let key = blocking(&state, move |db| {
        access_key::create_access_key(
            db,
            account_id,
            gallery_id,
            &req.name,
            req.can_download,
            req.can_use_collections,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(views::access_key(key))))
}

/// DELETE /api/gallery/{gallery_id}/access-key/{access_key_id}
pub async fn delete_access_key(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path((gallery_id, access_key_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    blocking(&state, move |db| {
        access_key::delete_access_key(db, account_id, gallery_id, access_key_id)
    })
    .await?;
    Ok(Json(MessageResponse::new("Access key deleted successfully")))
}
