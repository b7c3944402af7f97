use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use gallery_access::membership;
use gallery_access::session::Authenticated;
use gallery_types::api::{GrantMemberRequest, MemberResponse, MessageResponse};

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::{AppState, blocking};
use crate::views;

/// GET /api/gallery/{gallery_id}/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let account_id = auth.account.id;
    let members =
        blocking(&state, move |db| membership::list_members(db, account_id, gallery_id)).await?;
    Ok(Json(members.into_iter().map(views::member).collect()))
}

/// POST /api/gallery/{gallery_id}/members
pub async fn grant_member(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
    ValidJson(req): ValidJson<GrantMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = auth.account.id;
    let member = blocking(&state, move |db| {
        membership::grant_member(db, account_id, gallery_id, &req.username, req.access_level)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(views::member(member))))
}

/// DELETE /api/gallery/{gallery_id}/members/{account_id}
pub async fn revoke_member(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path((gallery_id, member_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    blocking(&state, move |db| {
        membership::revoke_member(db, account_id, gallery_id, member_id)
    })
    .await?;
    Ok(Json(MessageResponse::new("Member removed successfully")))
}
