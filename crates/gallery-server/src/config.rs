use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Default request body cap, sized for a batch of photos.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub frontend_url: String,
    /// Mail relay endpoint. Without one, mail is written to the log.
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("GALLERY_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("GALLERY_PORT must be a port number")?;
        let db_path: PathBuf = std::env::var("GALLERY_DB_PATH")
            .unwrap_or_else(|_| "gallery.db".into())
            .into();
        let storage_dir: PathBuf = std::env::var("GALLERY_STORAGE_DIR")
            .unwrap_or_else(|_| "./gallery-storage".into())
            .into();
        let frontend_url = std::env::var("FRONTEND_URL")
            .context("FRONTEND_URL must be set")?
            .trim_end_matches('/')
            .to_string();
        let mail_relay_url = std::env::var("GALLERY_MAIL_RELAY_URL")
            .ok()
            .filter(|v| !v.is_empty());
        let mail_from = std::env::var("GALLERY_MAIL_FROM")
            .unwrap_or_else(|_| "Gallery <no-reply@localhost>".into());
        let max_upload_bytes = std::env::var("GALLERY_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            host,
            port,
            db_path,
            storage_dir,
            frontend_url,
            mail_relay_url,
            mail_from,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("GALLERY_HOST and GALLERY_PORT must form a socket address")
    }
}
