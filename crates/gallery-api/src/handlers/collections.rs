//! Collection endpoints for gallery members.
//!
//! Members see a shared collection's images directly. For a private
//! collection they get one image count per access key and drill into a key's
//! set separately.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use gallery_access::collections::{self, MemberContents};
use gallery_access::session::Authenticated;
use gallery_access::AccessError;
use gallery_types::api::{
    AccessKeyName, CollectionResponse, CreateCollectionRequest, MemberCollectionView,
    MessageResponse, PrivateCollectionView,
};

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::{AppState, blocking};
use crate::views;

/// GET /api/gallery/{gallery_id}/collections
pub async fn list_collections(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
) -> Result<Json<Vec<CollectionResponse>>, ApiError> {
    let account_id = auth.account.id;
    let rows = blocking(&state, move |db| {
        collections::list_collections(db, account_id, gallery_id)
    })
    .await?;
    Ok(Json(rows.into_iter().map(views::collection).collect()))
}

/// POST /api/gallery/{gallery_id}/collection
pub async fn create_collection(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(gallery_id): Path<i64>,
    ValidJson(req): ValidJson<CreateCollectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = auth.account.id;
    let collection = blocking(&state, move |db| {
        collections::create_collection(db, account_id, gallery_id, &req.name, req.is_shared)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(views::collection(collection))))
}

/// GET /api/collection/{collection_id}
pub async fn get_collection(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(collection_id): Path<i64>,
) -> Result<Json<MemberCollectionView>, ApiError> {
    let account_id = auth.account.id;
    let (collection, gallery, contents) = blocking(&state, move |db| {
        let (collection, contents) =
            collections::contents_for_member(db, account_id, collection_id)?;
        let gallery = db
            .get_gallery(collection.gallery_id)?
            .ok_or(AccessError::NotMember)?;
        Ok::<_, AccessError>((collection, gallery, contents))
    })
    .await?;

    let (images, access_keys) = match contents {
        MemberContents::Shared(rows) => (views::images(rows, gallery.uuid), None),
        MemberContents::Private(counts) => (
            Vec::new(),
            Some(counts.into_iter().map(views::access_key_count).collect()),
        ),
    };
    Ok(Json(MemberCollectionView {
        id: collection.id,
        gallery_id: collection.gallery_id,
        name: collection.name,
        is_shared: collection.is_shared,
        images,
        access_keys,
    }))
}

/// GET /api/collection/{collection_id}/access/{access_key_id}
pub async fn get_private_collection(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path((collection_id, access_key_id)): Path<(i64, i64)>,
) -> Result<Json<PrivateCollectionView>, ApiError> {
    let account_id = auth.account.id;
    let (collection, key, gallery, images) = blocking(&state, move |db| {
        let (collection, key, images) =
            collections::private_contents_for_member(db, account_id, collection_id, access_key_id)?;
        let gallery = db
            .get_gallery(collection.gallery_id)?
            .ok_or(AccessError::NotMember)?;
        Ok::<_, AccessError>((collection, key, gallery, images))
    })
    .await?;

    Ok(Json(PrivateCollectionView {
        id: collection.id,
        gallery_id: collection.gallery_id,
        name: collection.name,
        is_shared: collection.is_shared,
        access_key: AccessKeyName {
            id: key.id,
            name: key.name,
        },
        images: views::images(images, gallery.uuid),
    }))
}

/// DELETE /api/collection/{collection_id}
pub async fn delete_collection(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(collection_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    blocking(&state, move |db| {
        collections::delete_collection(db, account_id, collection_id)
    })
    .await?;
    Ok(Json(MessageResponse::new("Collection deleted successfully")))
}
