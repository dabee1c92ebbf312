//! Configuration loading from a TOML file and the environment.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{parse_duration, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Optional TOML file seeding the configuration.
pub const PROXY_CONFIG: &str = "PROXY_CONFIG";

pub const SERVER_HOST: &str = "SERVER_HOST";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const ALLOWED_HOSTNAMES: &str = "ALLOWED_HOSTNAMES";
pub const RATE_LIMIT_NUMBER: &str = "RATE_LIMIT_NUMBER";
pub const RATE_LIMIT_PERIOD: &str = "RATE_LIMIT_PERIOD";
pub const RATE_LIMIT_PER_CLIENT: &str = "RATE_LIMIT_PER_CLIENT";
pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const UPSTREAM_TIMEOUT_SECS: &str = "UPSTREAM_TIMEOUT_SECS";
pub const MAX_REDIRECTS: &str = "MAX_REDIRECTS";
pub const MAX_BODY_BYTES: &str = "MAX_BODY_BYTES";
pub const METRICS_ADDRESS: &str = "METRICS_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the process configuration: defaults, then the optional
/// `PROXY_CONFIG` file, then environment variables.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    resolve(|key| env::var(key).ok())
}

/// `load_from_env` with an injectable variable lookup.
pub fn resolve<F>(lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(PROXY_CONFIG) {
        Some(path) if !path.trim().is_empty() => {
            let content = fs::read_to_string(path.trim())?;
            toml::from_str(&content)?
        }
        _ => ProxyConfig::default(),
    };

    apply_env(&mut config, &lookup);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// Unparseable values are logged and ignored.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(SERVER_HOST) {
        let host = host.trim();
        if !host.is_empty() {
            config.listener.host = host.to_string();
        }
    }
    parse_into(&lookup, SERVER_PORT, &mut config.listener.port);

    // Blank means unset, like SERVER_HOST
    if let Some(hosts) = lookup(ALLOWED_HOSTNAMES).filter(|h| !h.trim().is_empty()) {
        config.allowed_hostnames = parse_comma_separated(&hosts);
    }

    parse_into(&lookup, RATE_LIMIT_NUMBER, &mut config.rate_limit.max_requests);
    if let Some(period) = lookup(RATE_LIMIT_PERIOD) {
        match parse_duration(&period) {
            Ok(window) => config.rate_limit.window = window,
            Err(e) => tracing::warn!(
                var = RATE_LIMIT_PERIOD,
                value = %period,
                error = %e,
                "Invalid env var value, using default"
            ),
        }
    }
    parse_into(&lookup, RATE_LIMIT_PER_CLIENT, &mut config.rate_limit.per_client);

    parse_into(&lookup, REQUEST_TIMEOUT_SECS, &mut config.timeouts.request_secs);
    if let Some(value) = lookup(UPSTREAM_TIMEOUT_SECS) {
        match value.trim().parse::<u64>() {
            Ok(secs) => config.timeouts.upstream_secs = Some(secs),
            Err(_) => tracing::warn!(
                var = UPSTREAM_TIMEOUT_SECS,
                value = %value,
                "Invalid env var value, using default"
            ),
        }
    }
    parse_into(&lookup, MAX_REDIRECTS, &mut config.upstream.max_redirects);
    parse_into(&lookup, MAX_BODY_BYTES, &mut config.limits.max_body_bytes);

    if let Some(addr) = lookup(METRICS_ADDRESS) {
        let addr = addr.trim();
        if !addr.is_empty() {
            config.observability.metrics_address = Some(addr.to_string());
        }
    }
}

/// Parse `var` into `target`, keeping the current value on failure.
fn parse_into<F, T>(lookup: &F, var: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        match value.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => {
                tracing::warn!(var = var, value = %value, "Invalid env var value, using default");
            }
        }
    }
}

/// Split on commas, trim each entry, drop empties.
pub fn parse_comma_separated(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
