//! Database row types. These map directly to SQLite rows.
//! Distinct from gallery-types API payloads to keep the DB layer independent.

use chrono::{DateTime, Utc};
use gallery_types::models::Role;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    /// `None` for accounts that never set a password.
    pub password: Option<String>,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub account_id: i64,
    pub token: String,
    pub ip: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GalleryRow {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MemberRow {
    pub account_id: i64,
    pub username: String,
    pub name: String,
    pub access_level: Role,
}

#[derive(Debug, Clone)]
pub struct ImageRow {
    pub id: i64,
    pub gallery_id: i64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AccessKeyRow {
    pub id: i64,
    pub gallery_id: i64,
    pub token: String,
    pub name: String,
    pub can_download: bool,
    pub can_use_collections: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub id: i64,
    pub gallery_id: i64,
    pub name: String,
    pub is_shared: bool,
    pub created_at: DateTime<Utc>,
}

/// How many images one access key has put into a private collection.
#[derive(Debug, Clone)]
pub struct AccessKeyImageCountRow {
    pub access_key_id: i64,
    pub name: String,
    pub image_count: u64,
}
