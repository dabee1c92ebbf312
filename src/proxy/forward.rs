//! Upstream forwarding.
//!
//! # Responsibilities
//! - Own the shared outbound HTTP client
//! - Issue one request per inbound request, no retries
//! - Follow redirects up to a fixed depth
//! - Classify transport failures (unreachable vs timeout)
//!
//! # Design Decisions
//! - Environment proxies are ignored; the proxy never chains
//! - No response decompression: bodies are relayed byte-for-byte
//! - Non-2xx upstream statuses are a successful forward, not an error

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, StatusCode},
};
use reqwest::{redirect, Client};
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::ProxyError;
use crate::security::headers::strip_hop_by_hop;

/// A validated request ready to send upstream.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: Url,
    /// Already sanitized (no `Host`).
    pub headers: HeaderMap,
    /// Sent only when present; GET requests carry none.
    pub body: Option<Bytes>,
}

/// The upstream answer, body still streaming.
#[derive(Debug)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ForwardResponse {
    /// True iff the upstream status is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Outbound side of the proxy.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
}

impl Forwarder {
    /// Build the shared client from configuration.
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::limited(upstream.max_redirects))
            .no_proxy();
        if let Some(secs) = timeouts.upstream_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Send `request` upstream and return the response with its body unread.
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ProxyError> {
        let ForwardRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        strip_hop_by_hop(&mut headers);

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ProxyError::from_upstream)?;
        Ok(ForwardResponse::from(response))
    }
}
