//! Fixed-window rate limiting middleware.
//!
//! One window per key. The global mode uses a single key so every caller
//! shares the quota; per-client mode keys by peer IP.
//!
//! A window opens with the first admitted request and lasts `window`.
//! Once elapsed, the next request opens a fresh window. Refused requests
//! do not count against the quota.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::ProxyError;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Key used when windows are not split by client.
const GLOBAL_KEY: &str = "*";

/// Per-client maps are purged of expired windows past this size.
const CLEANUP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset: Duration },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Process-wide fixed-window limiter.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
    per_client: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests: config.max_requests,
            window: config.window,
            per_client: config.per_client,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn is_per_client(&self) -> bool {
        self.per_client
    }

    /// Check and count one request for `client` at the current instant.
    pub fn check(&self, client: Option<&str>) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Check and count one request for `client` at `now`.
    ///
    /// `client` is ignored unless the limiter is per-client.
    pub fn check_at(&self, client: Option<&str>, now: Instant) -> RateDecision {
        let key = match (self.per_client, client) {
            (true, Some(client)) => client,
            _ => GLOBAL_KEY,
        };

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if self.per_client && windows.len() > CLEANUP_THRESHOLD {
            let before = windows.len();
            let window = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.start) < window);
            tracing::debug!(
                removed_entries = before - windows.len(),
                remaining_entries = windows.len(),
                "Rate limiter cleanup completed"
            );
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            start: now,
            count: 0,
        });

        let mut elapsed = now.saturating_duration_since(entry.start);
        if elapsed >= self.window {
            entry.start = now;
            entry.count = 0;
            elapsed = Duration::ZERO;
        }
        let reset = self.window - elapsed;

        if entry.count < self.max_requests {
            entry.count += 1;
            RateDecision::Allowed {
                remaining: self.max_requests - entry.count,
                reset,
            }
        } else {
            RateDecision::Limited { retry_after: reset }
        }
    }
}

/// Middleware gating the forwarding routes.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    match limiter.check(client.as_deref()) {
        RateDecision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            insert_limit_headers(response.headers_mut(), limiter.max_requests(), remaining, reset);
            response
        }
        RateDecision::Limited { retry_after } => {
            tracing::warn!(
                client = client.as_deref().unwrap_or("unknown"),
                per_client = limiter.is_per_client(),
                retry_after_secs = ceil_secs(retry_after),
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();

            let mut response = ProxyError::RateLimitExceeded.into_response();
            let headers = response.headers_mut();
            insert_limit_headers(headers, limiter.max_requests(), 0, retry_after);
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(ceil_secs(retry_after)),
            );
            response
        }
    }
}

fn insert_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset)));
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}
