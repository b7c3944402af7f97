use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Hands mail to an HTTP relay as JSON.
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = RelayMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        };
        self.client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        info!("Sent \"{}\" to {}", subject, to);
        Ok(())
    }
}

/// Writes mail to the log instead of sending it. For development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!("Mail to {}: {}\n{}", to, subject, body);
        Ok(())
    }
}

pub fn verification_mail(frontend_url: &str, name: &str, token: &str) -> (String, String) {
    (
        "Gallery - Email verification".to_string(),
        format!(
            "Hi {name}!\n\n\
             Thank you for registering to Gallery!\n\
             To activate your account, click the link below:\n\
             {frontend_url}/auth/verify-email/{token}\n\n\
             If you did not register to Gallery, please ignore this email.\n\n\
             Best regards,\n\
             Gallery Team"
        ),
    )
}

pub fn password_reset_mail(frontend_url: &str, name: &str, token: &str) -> (String, String) {
    (
        "Gallery - Reset password".to_string(),
        format!(
            "Hi {name}!\n\n\
             To reset your password, click the link below:\n\
             {frontend_url}/auth/reset-password/{token}\n\n\
             Best regards,\n\
             Gallery Team"
        ),
    )
}
