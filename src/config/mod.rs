//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file ($PROXY_CONFIG, loader.rs)
//!     → environment variables (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow an empty environment
//! - Invalid env values fall back to defaults with a warning
//! - Validation separates syntactic (serde/parse) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::ListenerConfig;
pub use schema::ProxyConfig;
pub use schema::RateLimitConfig;
pub use schema::{LimitsConfig, ObservabilityConfig, TimeoutConfig, UpstreamConfig};
