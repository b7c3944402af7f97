use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gallery_access::AccessError;
use gallery_db::DbError;
use gallery_storage::StorageError;
use gallery_types::api::MessageResponse;
use tracing::{error, warn};
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded. Try again in {0} seconds.")]
    RateLimited(u64),

    #[error("database error: {0}")]
    Database(DbError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            warn!("{} {}", status.as_u16(), self);
            self.to_string()
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(_) => ApiError::Conflict("Resource already exists".into()),
            other => ApiError::Database(other),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => ApiError::Unauthorized("Session token missing.".into()),
            AccessError::InvalidSession => {
                ApiError::Unauthorized("Incorrect session token.".into())
            }
            AccessError::Blocked => ApiError::Unauthorized("You are blocked.".into()),
            AccessError::NotMember => ApiError::NotFound("Gallery not found".into()),
            AccessError::Forbidden => ApiError::Forbidden(
                "You do not have permission to perform this action".into(),
            ),
            AccessError::AccessKeyNotFound => ApiError::NotFound("Access key not found".into()),
            AccessError::CollectionNotFound => ApiError::NotFound("Collection not found".into()),
            AccessError::ImageNotFound => ApiError::NotFound("Image not found".into()),
            AccessError::AlreadyMember => {
                ApiError::Conflict("This image is already in this collection".into())
            }
            AccessError::Invalid(message) => ApiError::BadRequest(message),
            AccessError::NotFound(message) => ApiError::NotFound(message),
            AccessError::Conflict(message) => ApiError::Conflict(message),
            AccessError::Store(db) => db.into(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::BadRequest(first_validation_message(&errors))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::Error::new(err).context("blocking task failed"))
    }
}

/// The first human-readable message in a validation report.
fn first_validation_message(errors: &ValidationErrors) -> String {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {field}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_validation_message(inner),
            ValidationErrorsKind::List(items) => {
                if let Some(inner) = items.values().next() {
                    return first_validation_message(inner);
                }
            }
        }
    }
    "Invalid request".to_string()
}
