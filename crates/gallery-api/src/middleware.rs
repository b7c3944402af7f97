use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use gallery_access::AccessError;
use gallery_access::session;

use crate::cookies::SESSION_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolve the `gallery_session` cookie and put the [`session::Authenticated`]
/// account into request extensions. A stale cookie is cleared.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let db_state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        session::authenticate(&db_state.db, token.as_deref(), Utc::now())
    })
    .await;

    match result {
        Ok(Ok(auth)) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Ok(Err(AccessError::InvalidSession)) => {
            let jar = jar.remove(state.cookies.removal_cookie());
            (jar, ApiError::from(AccessError::InvalidSession)).into_response()
        }
        Ok(Err(e)) => ApiError::from(e).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
