//! Allowlist forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 ALLOWLIST PROXY              │
//!                         │                                              │
//!   GET/POST /?url=...    │  ┌──────┐   ┌────────────┐   ┌───────────┐   │
//!   ──────────────────────┼─▶│ CORS │──▶│ rate limit │──▶│ validator │   │
//!                         │  └──────┘   └────────────┘   └─────┬─────┘   │
//!                         │                                    ▼         │
//!                         │                            ┌──────────────┐  │
//!                         │                            │   sanitize   │  │
//!                         │                            │   headers    │  │
//!                         │                            └──────┬───────┘  │
//!                         │                                   ▼          │
//!   upstream status+body  │  ┌──────────┐              ┌────────────┐    │
//!   ◀─────────────────────┼──│  relay   │◀─────────────│ forwarder  │◀───┼──── Upstream
//!                         │  └──────────┘              └────────────┘    │
//!                         └──────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;

use allowlist_proxy::config::load_from_env;
use allowlist_proxy::observability::{logging, metrics};
use allowlist_proxy::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    tracing::info!("allowlist-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        allowed_hostnames = config.allowed_hostnames.len(),
        rate_limit = config.rate_limit.max_requests,
        rate_window = ?config.rate_limit.window,
        per_client = config.rate_limit.per_client,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Bind TCP listener
    let listener = match TcpListener::bind(config.listener.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                address = %config.listener.bind_address(),
                error = %e,
                "Failed to bind listener"
            );
            return Err(e.into());
        }
    };

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %addr,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let _signal_task = shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
