//! Liveness probe.
//!
//! Always answers `200 OK`. No rate limiting, no validation, no upstream.

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "OK\n"
}
