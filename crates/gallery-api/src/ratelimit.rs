use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, MatchedPath, Request, State};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// When the window that started with this hit closes, in ms since the epoch.
    pub reset_at_ms: u64,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record a hit on `key` unless `limit` hits already fall inside the
    /// window ending at `now_ms`. Pruning, counting and recording happen as
    /// one step.
    async fn hit(&self, key: &str, window_ms: u64, limit: u32, now_ms: u64)
    -> anyhow::Result<RateDecision>;
}

/// Every this many hits the store drops keys whose windows have all expired.
const SWEEP_EVERY: u64 = 1024;

/// Sliding-window log kept in process memory.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    inner: Mutex<Windows>,
}

#[derive(Default)]
struct Windows {
    hits: HashMap<String, Window>,
    since_sweep: u64,
}

struct Window {
    window_ms: u64,
    hits: VecDeque<u64>,
}

impl Window {
    fn prune(&mut self, now_ms: u64) {
        while self
            .hits
            .front()
            .is_some_and(|&t| t.saturating_add(self.window_ms) <= now_ms)
        {
            self.hits.pop_front();
        }
    }
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().map(|w| w.hits.len()).unwrap_or_default()
    }
}

impl Windows {
    fn sweep(&mut self, now_ms: u64) {
        self.hits.retain(|_, window| {
            window.prune(now_ms);
            !window.hits.is_empty()
        });
        self.since_sweep = 0;
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        window_ms: u64,
        limit: u32,
        now_ms: u64,
    ) -> anyhow::Result<RateDecision> {
        let mut windows = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("rate limit store lock poisoned"))?;

        windows.since_sweep += 1;
        if windows.since_sweep >= SWEEP_EVERY {
            windows.sweep(now_ms);
        }

        let window = windows
            .hits
            .entry(key.to_string())
            .or_insert_with(|| Window {
                window_ms,
                hits: VecDeque::new(),
            });
        window.window_ms = window_ms;
        window.prune(now_ms);

        let count = window.hits.len() as u32;
        if count >= limit {
            return Ok(RateDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: now_ms + window_ms,
            });
        }
        window.hits.push_back(now_ms);
        Ok(RateDecision {
            allowed: true,
            remaining: limit - count - 1,
            reset_at_ms: now_ms + window_ms,
        })
    }
}

/// A limit of `limit` requests per `window_ms` for one route.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub window_ms: u64,
    pub limit: u32,
}

impl RateLimit {
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            window_ms: 60 * 1000,
            limit,
        }
    }

    pub const fn per_hour(limit: u32) -> Self {
        Self {
            window_ms: 60 * 60 * 1000,
            limit,
        }
    }

    fn window_secs(&self) -> u64 {
        self.window_ms.div_ceil(1000)
    }
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Extractor for [`client_ip`].
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Per-route sliding-window limiter, keyed `ratelimit:{ip}:{method}:{route}`.
pub async fn rate_limit(
    State((state, rule)): State<(AppState, RateLimit)>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(req.headers(), req.extensions()) else {
        warn!("Rate limit: client IP not found, skipping");
        return next.run(req).await;
    };
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let key = format!("ratelimit:{}:{}:{}", ip, req.method(), route);

    let decision = match state
        .rate_limits
        .hit(&key, rule.window_ms, rule.limit, now_ms())
        .await
    {
        Ok(decision) => decision,
        Err(e) => {
            error!("Rate limit: {:#}", e);
            return next.run(req).await;
        }
    };

    if !decision.allowed {
        return ApiError::RateLimited(rule.window_secs()).into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(rule.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at_ms));
    response
}
