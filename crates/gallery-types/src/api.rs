use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Role;
use crate::validate::validate_username;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 256, message = "Name must be between 2 and 256 characters long"))]
    pub name: String,
    #[validate(
        length(min = 2, max = 32, message = "Username must be between 2 and 32 characters long"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 256, message = "Password must be between 8 and 256 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 256, message = "Password must be between 8 and 256 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RequestPasswordResetRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, max = 256, message = "Password must be between 8 and 256 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 8, max = 256, message = "Password must be between 8 and 256 characters long"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 256, message = "Password must be between 8 and 256 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub username: String,
    pub is_admin: bool,
    pub session_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: i64,
    pub ip: Option<String>,
    pub expires_at: DateTime<Utc>,
}

// -- Galleries --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateGalleryRequest {
    #[validate(length(min = 2, max = 128, message = "Name must be between 2 and 128 characters long"))]
    pub name: String,
    #[validate(length(min = 2, max = 256, message = "Description must be between 2 and 256 characters long"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateGalleryRequest {
    #[validate(length(min = 2, max = 128, message = "Name must be between 2 and 128 characters long"))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 256, message = "Description must be between 2 and 256 characters long"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GallerySummary {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub access_level: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryDetails {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub access_level: Role,
    pub images: Vec<ImageResponse>,
    pub collections: Vec<CollectionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: i64,
    pub gallery_id: i64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    /// Blob key the image bytes are stored under.
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub images: Vec<ImageResponse>,
}

// -- Members --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrantMemberRequest {
    #[validate(length(min = 2, max = 32, message = "Username must be between 2 and 32 characters long"))]
    pub username: String,
    pub access_level: Role,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub account_id: i64,
    pub username: String,
    pub name: String,
    pub access_level: Role,
}

// -- Access keys --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAccessKeyRequest {
    #[validate(length(min = 2, max = 256, message = "Name must be between 2 and 256 characters long"))]
    pub name: String,
    pub can_download: bool,
    #[serde(default)]
    pub can_use_collections: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyResponse {
    pub id: i64,
    pub gallery_id: i64,
    pub access_key: String,
    pub name: String,
    pub can_download: bool,
    pub can_use_collections: bool,
    pub created_at: DateTime<Utc>,
}

// -- Collections --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCollectionRequest {
    #[validate(length(min = 2, max = 128, message = "Name must be between 2 and 128 characters long"))]
    pub name: String,
    pub is_shared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: i64,
    pub gallery_id: i64,
    pub name: String,
    pub is_shared: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyImageCount {
    pub id: i64,
    pub name: String,
    pub image_count: u64,
}

/// Collection as seen by a gallery member.
///
/// Shared collections list their images. Private collections list, per
/// access key, how many images that key has put in the collection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCollectionView {
    pub id: i64,
    pub gallery_id: i64,
    pub name: String,
    pub is_shared: bool,
    pub images: Vec<ImageResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_keys: Option<Vec<AccessKeyImageCount>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessKeyName {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateCollectionView {
    pub id: i64,
    pub gallery_id: i64,
    pub name: String,
    pub is_shared: bool,
    pub access_key: AccessKeyName,
    pub images: Vec<ImageResponse>,
}

// -- Access-key holders --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddToCollectionRequest {
    pub image_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SharedGallery {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedImage {
    pub id: i64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub key: String,
    /// Collections this image is in, as visible to the requesting key.
    pub collection_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCollection {
    pub id: i64,
    pub name: String,
    pub is_shared: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGalleryView {
    pub can_download: bool,
    pub can_use_collections: bool,
    pub gallery: SharedGallery,
    pub images: Vec<SharedImage>,
    pub collections: Vec<SharedCollection>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionContents {
    pub id: i64,
    pub name: String,
    pub is_shared: bool,
    pub images: Vec<ImageResponse>,
}
