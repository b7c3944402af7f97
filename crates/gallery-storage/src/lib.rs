//! Blob storage for image bytes.
//!
//! Image metadata lives in the database; the bytes live behind a [`BlobStore`]
//! under keys of the form `gallery/{gallery_uuid}/{file_name}`.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage key of an image inside a gallery.
pub fn image_key(gallery_uuid: Uuid, file_name: &str) -> String {
    format!("{}/{file_name}", gallery_prefix(gallery_uuid))
}

/// Prefix shared by every blob of a gallery.
pub fn gallery_prefix(gallery_uuid: Uuid) -> String {
    format!("gallery/{gallery_uuid}")
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing anything already there.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Delete one blob. A missing blob is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every blob whose key starts with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<()>;
}

/// Reject keys that could escape the storage root.
fn check_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
