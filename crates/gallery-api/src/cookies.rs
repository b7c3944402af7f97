use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::Duration;
use gallery_access::session::SESSION_TTL_DAYS;

pub const SESSION_COOKIE: &str = "gallery_session";

/// Attributes of the session cookie, derived from the frontend URL.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    pub domain: Option<String>,
    pub secure: bool,
}

impl CookieSettings {
    /// `https://app.photos.example.com` gives domain `.example.com`, secure.
    /// A single-label host such as `localhost` is used as is.
    pub fn from_frontend_url(frontend_url: &str) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(frontend_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("FRONTEND_URL has no host: {frontend_url}"))?;
        Ok(Self {
            domain: Some(cookie_domain(host)),
            secure: url.scheme() == "https",
        })
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = self.base(token);
        cookie.set_max_age(Duration::days(SESSION_TTL_DAYS));
        cookie
    }

    /// A cookie with the same name, path and domain as the session cookie,
    /// for `CookieJar::remove`.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.base(String::new())
    }

    fn base(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build();
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

fn cookie_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host.to_string();
    }
    format!(".{}", labels[labels.len() - 2..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_last_two_labels() {
        let settings = CookieSettings::from_frontend_url("https://app.photos.example.com").unwrap();
        assert_eq!(settings.domain.as_deref(), Some(".example.com"));
        assert!(settings.secure);
    }

    #[test]
    fn single_label_host_is_used_as_is() {
        let settings = CookieSettings::from_frontend_url("http://localhost:3000").unwrap();
        assert_eq!(settings.domain.as_deref(), Some("localhost"));
        assert!(!settings.secure);
    }

    #[test]
    fn session_cookie_attributes() {
        let settings = CookieSettings::from_frontend_url("https://gallery.example.org").unwrap();
        let cookie = settings.session_cookie("tok".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::days(30)));
        assert_eq!(cookie.domain(), Some("example.org"));
    }
}
