use gallery_db::DbError;

pub type Result<T> = std::result::Result<T, AccessError>;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Account is blocked")]
    Blocked,

    /// Not a member of the gallery. Reported like a missing gallery.
    #[error("Gallery not found")]
    NotMember,

    #[error("Forbidden")]
    Forbidden,

    #[error("Access key not found")]
    AccessKeyNotFound,

    #[error("Collection not found")]
    CollectionNotFound,

    #[error("Image not found")]
    ImageNotFound,

    #[error("Image is already in this collection")]
    AlreadyMember,

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] DbError),
}
