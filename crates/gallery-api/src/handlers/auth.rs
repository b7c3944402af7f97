use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use gallery_access::session::{self, Authenticated};
use gallery_access::generate_token;
use gallery_types::api::{
    AccountResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    RequestPasswordResetRequest, ResetPasswordRequest, SessionResponse,
};
use tracing::info;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::mail::{password_reset_mail, verification_mail};
use crate::passwords::{hash_password, verify_password};
use crate::ratelimit::ClientIp;
use crate::state::{AppState, blocking};
use crate::views;

const NO_PASSWORD: &str = "This account has no password, please reset your password.";

/// GET /api/auth
pub async fn me(Extension(auth): Extension<Authenticated>) -> Json<AccountResponse> {
    Json(AccountResponse {
        id: auth.account.id,
        email: auth.account.email,
        name: auth.account.name,
        username: auth.account.username,
        is_admin: auth.account.is_admin,
        session_id: auth.session.id,
    })
}

/// GET /api/auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let account_id = auth.account.id;
    let sessions = blocking(&state, move |db| session::list_sessions(db, account_id)).await?;
    Ok(Json(sessions.into_iter().map(views::session).collect()))
}

/// DELETE /api/auth/session/{session_id}
pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(session_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = auth.account.id;
    blocking(&state, move |db| {
        session::revoke_session(db, account_id, session_id)
    })
    .await?;
    Ok(Json(MessageResponse::new("Session revoked successfully")))
}

/// POST /api/auth/register
///
/// The verification mail goes out before anything is stored, so a failed send
/// leaves no account behind.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.clone();
    let existing = blocking(&state, move |db| db.get_account_by_email(&email)).await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let token = generate_token();

    let (subject, body) = verification_mail(&state.frontend_url, &req.name, &token);
    state
        .mailer
        .send(&req.email, &subject, &body)
        .await
        .map_err(|e| ApiError::Internal(e.context("sending verification mail")))?;

    let account_id = blocking(&state, move |db| {
        db.create_account(
            &req.username,
            &req.name,
            &req.email,
            Some(password_hash.as_str()),
            Some(token.as_str()),
        )
    })
    .await
    .map_err(|e| match e {
        ApiError::Conflict(_) => ApiError::Conflict("Username or email already taken".into()),
        other => other,
    })?;

    info!("Registered account {}", account_id);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Registered successfully")),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let wrong = || ApiError::Unauthorized("Incorrect email or password".into());

    let email = req.email.clone();
    let account = blocking(&state, move |db| db.get_account_by_email(&email))
        .await?
        .ok_or_else(wrong)?;

    let hash = account
        .password
        .clone()
        .ok_or_else(|| ApiError::BadRequest(NO_PASSWORD.into()))?;
    let password = req.password;
    let valid =
        tokio::task::spawn_blocking(move || verify_password(&hash, &password)).await??;
    if !valid {
        return Err(wrong());
    }
    if !account.is_email_verified {
        return Err(ApiError::Unauthorized("Email is not verified".into()));
    }
    if account.is_blocked {
        return Err(ApiError::Unauthorized("You are blocked".into()));
    }

    let account_id = account.id;
    let session = blocking(&state, move |db| {
        session::open_session(db, account_id, ip.as_deref(), Utc::now())
    })
    .await?;

    info!("Account {} logged in (session {})", account.id, session.id);
    let jar = jar.add(state.cookies.session_cookie(session.token));
    Ok((
        jar,
        Json(AccountResponse {
            id: account.id,
            email: account.email,
            name: account.name,
            username: account.username,
            is_admin: account.is_admin,
            session_id: session.id,
        }),
    ))
}

/// POST /api/auth/verify-email/{token}
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let verified = blocking(&state, move |db| {
        match db.get_account_by_verification_token(&token)? {
            Some(account) => db.mark_email_verified(account.id),
            None => Ok(false),
        }
    })
    .await?;
    if !verified {
        return Err(ApiError::BadRequest("Invalid token".into()));
    }
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let token = auth.session.token;
    blocking(&state, move |db| session::close_session(db, &token)).await?;
    let jar = jar.remove(state.cookies.removal_cookie());
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// POST /api/auth/request-password-reset
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RequestPasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = req.email.clone();
    let account = blocking(&state, move |db| db.get_account_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let token = generate_token();
    let (subject, body) = password_reset_mail(&state.frontend_url, &account.name, &token);
    state
        .mailer
        .send(&account.email, &subject, &body)
        .await
        .map_err(|e| ApiError::Internal(e.context("sending password reset mail")))?;

    let account_id = account.id;
    blocking(&state, move |db| db.set_password_reset_token(account_id, &token)).await?;
    Ok(Json(MessageResponse::new(
        "Reset password email sent successfully",
    )))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = req.token;
    let account = blocking(&state, move |db| db.get_account_by_reset_token(&token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid token".into()))?;

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let account_id = account.id;
    blocking(&state, move |db| db.reset_password(account_id, &hash)).await?;

    info!("Password reset for account {}", account.id);
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let hash = auth
        .account
        .password
        .ok_or_else(|| ApiError::BadRequest(NO_PASSWORD.into()))?;

    let old = req.old_password;
    let new = req.new_password;
    let new_hash = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<String>> {
        if !verify_password(&hash, &old)? {
            return Ok(None);
        }
        hash_password(&new).map(Some)
    })
    .await??
    .ok_or_else(|| ApiError::Unauthorized("Incorrect old password".into()))?;

    let account_id = auth.account.id;
    blocking(&state, move |db| db.set_password(account_id, &new_hash)).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, header};
    use chrono::Duration;
    use serde_json::json;

    use gallery_access::session::SESSION_TTL_DAYS;

    use crate::cookies::SESSION_COOKIE;
    use crate::passwords::{hash_password, verify_password};
    use crate::testing::{TestApp, body_json, json_request};

    use super::*;

    fn registration(email: &str) -> serde_json::Value {
        json!({
            "name": "Alice",
            "username": "alice",
            "email": email,
            "password": "correct horse battery",
        })
    }

    #[tokio::test]
    async fn register_sends_verification_mail() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(registration("alice@example.com")),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let account = app
            .db()
            .get_account_by_email("alice@example.com")
            .unwrap()
            .unwrap();
        assert!(!account.is_email_verified);
        let token = account.email_verification_token.unwrap();

        let sent = app.mail.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert!(sent[0].body.contains(&format!("/auth/verify-email/{token}")));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let app = TestApp::new();
        app.db()
            .create_account("taken", "Taken", "alice@example.com", None, None)
            .unwrap();

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(registration("alice@example.com")),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(resp).await["message"],
            "User with this email already exists"
        );
        assert!(app.mail.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_mail_stores_nothing() {
        let app = TestApp::with_failing_mailer();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(registration("alice@example.com")),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["message"], "Internal server error");
        assert!(
            app.db()
                .get_account_by_email("alice@example.com")
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn invalid_body_is_a_bad_request() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Alice",
                    "username": "not valid!",
                    "email": "alice@example.com",
                    "password": "correct horse battery",
                })),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["message"],
            "Username must only contain letters and numbers"
        );
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let app = TestApp::new();
        let hash = hash_password("correct horse battery").unwrap();
        let id = app
            .db()
            .create_account("alice", "Alice", "alice@example.com", Some(hash.as_str()), None)
            .unwrap();
        app.db().mark_email_verified(id).unwrap();

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "alice@example.com", "password": "correct horse battery"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        assert!(set_cookie.contains("HttpOnly"));

        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let resp = app
            .send(json_request(Method::GET, "/api/auth", Some(&cookie), None))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["username"], "alice");
    }

    #[tokio::test]
    async fn login_requires_verified_email() {
        let app = TestApp::new();
        let hash = hash_password("correct horse battery").unwrap();
        app.db()
            .create_account("alice", "Alice", "alice@example.com", Some(hash.as_str()), Some("tok"))
            .unwrap();

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "alice@example.com", "password": "correct horse battery"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["message"], "Email is not verified");
    }

    #[tokio::test]
    async fn expired_session_is_rejected_and_cleared() {
        let app = TestApp::new();
        let id = app
            .db()
            .create_account("alice", "Alice", "alice@example.com", None, None)
            .unwrap();
        let started = Utc::now() - Duration::days(SESSION_TTL_DAYS + 1);
        let stale = session::open_session(app.db(), id, None, started).unwrap();

        let cookie = format!("{SESSION_COOKIE}={}", stale.token);
        let resp = app
            .send(json_request(Method::GET, "/api/auth", Some(&cookie), None))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE}=;")));
        assert!(set_cookie.contains("Max-Age=0"));

        // Not renewed as a side effect.
        let (session, _) = app
            .db()
            .get_session_with_account(&stale.token)
            .unwrap()
            .unwrap();
        assert_eq!(session.expires_at, stale.expires_at);
    }

    #[tokio::test]
    async fn logout_deletes_the_session() {
        let app = TestApp::new();
        let (_, cookie) = app.sign_in("alice");

        let resp = app
            .send(json_request(Method::POST, "/api/auth/logout", Some(&cookie), None))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .send(json_request(Method::GET, "/api/auth", Some(&cookie), None))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sessions_of_other_accounts_cannot_be_revoked() {
        let app = TestApp::new();
        let (_, alice) = app.sign_in("alice");
        let (bob_id, _) = app.sign_in("bob");
        let bob_session = app.db().list_sessions(bob_id).unwrap()[0].id;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/api/auth/session/{bob_session}"),
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.db().list_sessions(bob_id).unwrap().len(), 1);
    }

    fn with_password(app: &TestApp, account_id: i64, password: &str) {
        let hash = hash_password(password).unwrap();
        app.db().set_password(account_id, &hash).unwrap();
    }

    #[tokio::test]
    async fn change_password_checks_the_old_one() {
        let app = TestApp::new();
        let (id, cookie) = app.sign_in("alice");
        let change = |old: &str| {
            json_request(
                Method::POST,
                "/api/auth/change-password",
                Some(&cookie),
                Some(json!({"oldPassword": old, "newPassword": "new password 42"})),
            )
        };

        let resp = app.send(change("whatever123")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], NO_PASSWORD);

        with_password(&app, id, "old password 1");
        let resp = app.send(change("wrong password")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["message"], "Incorrect old password");

        let resp = app.send(change("old password 1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let stored = app.db().get_account_by_id(id).unwrap().unwrap();
        assert!(verify_password(&stored.password.unwrap(), "new password 42").unwrap());
    }

    #[tokio::test]
    async fn verify_email_rejects_unknown_tokens() {
        let app = TestApp::new();
        let id = app
            .db()
            .create_account("alice", "Alice", "alice@example.com", None, Some("tok"))
            .unwrap();

        let verify = |token: &str| {
            json_request(
                Method::POST,
                &format!("/api/auth/verify-email/{token}"),
                None,
                None,
            )
        };
        let resp = app.send(verify("nope")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "Invalid token");

        assert_eq!(app.send(verify("tok")).await.status(), StatusCode::OK);
        let account = app.db().get_account_by_id(id).unwrap().unwrap();
        assert!(account.is_email_verified);
    }

    #[tokio::test]
    async fn password_reset_for_unknown_email_is_not_found() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/request-password-reset",
                None,
                Some(json!({"email": "ghost@example.com"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "User not found");
        assert!(app.mail.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_token_is_kept_only_after_the_mail_is_sent() {
        let app = TestApp::with_failing_mailer();
        let (id, _) = app.sign_in("alice");

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/request-password-reset",
                None,
                Some(json!({"email": "alice@example.com"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let account = app.db().get_account_by_id(id).unwrap().unwrap();
        assert!(account.password_reset_token.is_none());
    }

    #[tokio::test]
    async fn reset_password_replaces_it_and_drops_sessions() {
        let app = TestApp::new();
        let (id, cookie) = app.sign_in("alice");

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/request-password-reset",
                None,
                Some(json!({"email": "alice@example.com"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let token = app
            .db()
            .get_account_by_id(id)
            .unwrap()
            .unwrap()
            .password_reset_token
            .unwrap();
        let sent = app.mail.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains(&token));

        let reset = |token: &str| {
            json_request(
                Method::POST,
                "/api/auth/reset-password",
                None,
                Some(json!({"token": token, "password": "brand new secret"})),
            )
        };
        let resp = app.send(reset("not-the-token")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "Invalid token");
        assert_eq!(app.db().list_sessions(id).unwrap().len(), 1);

        assert_eq!(app.send(reset(&token)).await.status(), StatusCode::OK);
        let account = app.db().get_account_by_id(id).unwrap().unwrap();
        assert!(account.password_reset_token.is_none());
        assert!(verify_password(&account.password.unwrap(), "brand new secret").unwrap());
        assert!(app.db().list_sessions(id).unwrap().is_empty());

        let resp = app
            .send(json_request(Method::GET, "/api/auth", Some(&cookie), None))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // The token is single use.
        assert_eq!(app.send(reset(&token)).await.status(), StatusCode::BAD_REQUEST);
    }
}
