use std::sync::Arc;

use gallery_db::Database;
use gallery_storage::BlobStore;

use crate::cookies::CookieSettings;
use crate::error::ApiError;
use crate::mail::Mailer;
use crate::ratelimit::RateLimitStore;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler may touch, built once at startup.
pub struct AppStateInner {
    pub db: Database,
    pub blobs: Arc<dyn BlobStore>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub cookies: CookieSettings,
    /// Base URL used in links sent by email.
    pub frontend_url: String,
}

/// Run store work on the blocking pool.
pub async fn blocking<T, E, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await?
        .map_err(Into::into)
}
