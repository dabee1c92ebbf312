//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, request ID, tracing, rate limit)
//! - Bind server to listener
//! - Validate, sanitize and forward `GET /` and `POST /`
//! - Serve the liveness probe
//!
//! # Design Decisions
//! - `/` answers GET and POST only; HEAD is not implied by GET
//! - The request deadline is enforced around the upstream call and
//!   surfaces as 504, like any other upstream timeout

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware,
    routing::{get, head},
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::health;
use crate::http::request::{make_span, MakeRequestUuidV4, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait;
use crate::observability::metrics;
use crate::proxy::forward::{ForwardRequest, ForwardResponse, Forwarder};
use crate::proxy::validator::Allowlist;
use crate::security::headers::sanitize;
use crate::security::limits::read_body;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub allowlist: Allowlist,
    pub forwarder: Forwarder,
    pub max_body_bytes: usize,
    /// Deadline for one forward, upstream headers included.
    pub request_timeout: Duration,
}

/// Query string of the forwarding endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ForwardParams {
    pub url: Option<String>,
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> std::result::Result<Self, reqwest::Error> {
        let forwarder = Forwarder::new(&config.upstream, &config.timeouts)?;
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server around an existing forwarder.
    pub fn with_forwarder(config: ProxyConfig, forwarder: Forwarder) -> Self {
        let state = AppState {
            allowlist: Allowlist::new(config.allowed_hostnames.iter().cloned()),
            forwarder,
            max_body_bytes: config.limits.max_body_bytes,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        let router = Self::build_router(state, limiter);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let forwarding = Router::new()
            .route("/", get(forward_get).post(forward_post))
            .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            // HEAD would otherwise fall back to the GET handler
            .route("/", head(head_not_allowed));

        Router::new()
            .route("/healthz", get(health::healthz))
            .merge(forwarding)
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuidV4))
            .layer(CorsLayer::permissive())
    }

    /// A clone of the fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are drained first.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> std::result::Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowed_hostnames = ?self.config.allowed_hostnames,
            rate_limit = self.config.rate_limit.max_requests,
            rate_window = ?self.config.rate_limit.window,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

async fn head_not_allowed() -> (StatusCode, [(header::HeaderName, &'static str); 1]) {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET,POST")])
}

type ForwardQuery = std::result::Result<Query<ForwardParams>, QueryRejection>;

async fn forward_get(
    State(state): State<AppState>,
    params: ForwardQuery,
    headers: HeaderMap,
) -> Result<ForwardResponse> {
    let url = validate(&state, params)?;
    with_deadline(&state, relay(&state, Method::GET, url, headers, None)).await
}

async fn forward_post(
    State(state): State<AppState>,
    params: ForwardQuery,
    headers: HeaderMap,
    body: Body,
) -> Result<ForwardResponse> {
    // Validate before buffering so refused requests cost nothing
    let url = validate(&state, params)?;
    let body = read_body(&headers, body, state.max_body_bytes)
        .await
        .map_err(reject)?;
    with_deadline(&state, relay(&state, Method::POST, url, headers, Some(body))).await
}

fn validate(state: &AppState, params: ForwardQuery) -> Result<Url> {
    let Query(params) = params.map_err(|e| {
        tracing::debug!(error = %e, "Query string failed to parse");
        reject(ProxyError::MalformedUrl)
    })?;

    state
        .allowlist
        .validate(params.url.as_deref())
        .into_result()
        .map_err(|reason| reject(reason.into()))
}

/// Bound `forward` by the request deadline.
async fn with_deadline<F>(state: &AppState, forward: F) -> Result<ForwardResponse>
where
    F: Future<Output = Result<ForwardResponse>>,
{
    match tokio::time::timeout(state.request_timeout, forward).await {
        Ok(result) => result,
        Err(_) => {
            let err = ProxyError::DeadlineExceeded;
            tracing::error!(
                timeout_secs = state.request_timeout.as_secs(),
                "Request deadline exceeded"
            );
            metrics::record_upstream_error(err.kind());
            Err(err)
        }
    }
}

/// Sanitize, forward, relay.
async fn relay(
    state: &AppState,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
) -> Result<ForwardResponse> {
    let start_time = Instant::now();
    tracing::debug!(method = %method, target = %url, "Forwarding request");

    let request = ForwardRequest {
        method: method.clone(),
        url,
        headers: sanitize(Some(&headers)).unwrap_or_default(),
        body,
    };

    let response = state.forwarder.forward(request).await.map_err(|e| {
        if e.is_server_error() {
            tracing::error!(
                method = %method,
                error = %e,
                cause = ?std::error::Error::source(&e),
                "Upstream error"
            );
        }
        metrics::record_upstream_error(e.kind());
        e
    })?;

    metrics::record_request(method.as_str(), response.status.as_u16(), start_time);
    if !response.ok() {
        tracing::info!(status = %response.status, "Relaying upstream error status");
    }

    Ok(response)
}

fn reject(err: ProxyError) -> ProxyError {
    tracing::debug!(reason = err.kind(), "Request rejected");
    metrics::record_rejected(err.kind());
    err
}
