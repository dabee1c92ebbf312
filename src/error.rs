//! Error taxonomy for the forwarding pipeline.
//!
//! Every request-scoped failure maps to exactly one status code and a short
//! plain-text body. Upstream non-2xx responses are not errors: they are
//! relayed as-is by the forwarder.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::proxy::validator::RejectReason;

/// Result alias for request handling.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Request-scoped failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` query parameter is absent or empty.
    #[error("url parameter is required")]
    MissingUrl,

    /// The `url` query parameter is not an absolute http(s) URL.
    #[error("url parameter is not a valid url")]
    MalformedUrl,

    /// The target hostname is not in the allowlist.
    #[error("hostname is not allowed")]
    HostnameNotAllowed,

    /// The admission quota for the current window is exhausted.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// The inbound body exceeded the configured cap.
    #[error("request body too large")]
    BodyTooLarge,

    /// The inbound body stream failed before completion.
    #[error("failed to read request body")]
    BodyRead,

    /// Connect, DNS, TLS or redirect failure talking to the upstream.
    #[error("upstream request failed")]
    UpstreamUnreachable(#[source] reqwest::Error),

    /// The upstream did not answer within the configured deadline.
    #[error("upstream request timed out")]
    UpstreamTimeout(#[source] reqwest::Error),

    /// The request deadline elapsed before the upstream answered.
    #[error("upstream request timed out")]
    DeadlineExceeded,
}

impl ProxyError {
    /// Classify a transport error from the upstream client.
    pub fn from_upstream(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(err)
        } else {
            Self::UpstreamUnreachable(err)
        }
    }

    /// Status code returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::MalformedUrl | Self::HostnameNotAllowed | Self::BodyRead => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) | Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// True for failures on the proxy/upstream side, logged at error level.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingUrl => "missing_url",
            Self::MalformedUrl => "malformed_url",
            Self::HostnameNotAllowed => "hostname_not_allowed",
            Self::RateLimitExceeded => "rate_limited",
            Self::BodyTooLarge => "body_too_large",
            Self::BodyRead => "body_read",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::UpstreamTimeout(_) => "upstream_timeout",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl From<RejectReason> for ProxyError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::MissingUrl => Self::MissingUrl,
            RejectReason::MalformedUrl => Self::MalformedUrl,
            RejectReason::HostnameNotAllowed => Self::HostnameNotAllowed,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), format!("{}\n", self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_bodies() {
        assert_eq!(format!("{}\n", ProxyError::MissingUrl), "url parameter is required\n");
        assert_eq!(
            format!("{}\n", ProxyError::HostnameNotAllowed),
            "hostname is not allowed\n"
        );
        assert_eq!(
            format!("{}\n", ProxyError::MalformedUrl),
            "url parameter is not a valid url\n"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::MissingUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::MalformedUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::HostnameNotAllowed.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ProxyError::BodyTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ProxyError::DeadlineExceeded.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert!(ProxyError::DeadlineExceeded.is_server_error());
        assert!(!ProxyError::RateLimitExceeded.is_server_error());
    }

    #[test]
    fn test_reject_reason_conversion() {
        assert!(matches!(
            ProxyError::from(RejectReason::MalformedUrl),
            ProxyError::MalformedUrl
        ));
        assert!(matches!(
            ProxyError::from(RejectReason::HostnameNotAllowed),
            ProxyError::HostnameNotAllowed
        ));
    }

    #[test]
    fn test_into_response_is_plain_text() {
        let response = ProxyError::HostnameNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
