//! Router harness for handler tests: in-memory database, blob store and
//! rate-limit store, and a mailer that records instead of sending.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, header};
use axum::response::Response;
use chrono::Utc;
use gallery_access::session;
use gallery_db::Database;
use gallery_storage::MemoryBlobStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::cookies::{CookieSettings, SESSION_COOKIE};
use crate::mail::Mailer;
use crate::ratelimit::MemoryRateLimitStore;
use crate::routes::router;
use crate::state::{AppState, AppStateInner};

pub const BOUNDARY: &str = "gallery-test-boundary";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        anyhow::bail!("relay unavailable")
    }
}

pub struct TestApp {
    pub state: AppState,
    pub blobs: Arc<MemoryBlobStore>,
    pub mail: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let mail = Arc::new(RecordingMailer::default());
        Self::build(mail.clone(), mail)
    }

    pub fn with_failing_mailer() -> Self {
        Self::build(Arc::new(FailingMailer), Arc::new(RecordingMailer::default()))
    }

    fn build(mailer: Arc<dyn Mailer>, mail: Arc<RecordingMailer>) -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            blobs: blobs.clone(),
            mailer,
            rate_limits: Arc::new(MemoryRateLimitStore::new()),
            cookies: CookieSettings::default(),
            frontend_url: "http://localhost:5173".into(),
        });
        Self { state, blobs, mail }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        router(self.state.clone()).oneshot(req).await.unwrap()
    }

    /// A verified account with an open session. Returns the account id and a
    /// `Cookie` header value.
    pub fn sign_in(&self, username: &str) -> (i64, String) {
        let id = self
            .db()
            .create_account(
                username,
                username,
                &format!("{username}@example.com"),
                None,
                None,
            )
            .unwrap();
        self.db().mark_email_verified(id).unwrap();
        let session = session::open_session(self.db(), id, None, Utc::now()).unwrap();
        (id, format!("{SESSION_COOKIE}={}", session.token))
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A `multipart/form-data` upload with every file in the `files` field.
pub fn upload_request(uri: &str, cookie: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small valid PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
