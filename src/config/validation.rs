//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and env parsing handle syntax)
//! - Validate value ranges (quota > 0, window > 0, timeouts > 0)
//! - Check the bind host is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.allowed_hostnames.is_empty() {
        errors.push(ValidationError::new(
            "allowed_hostnames",
            "at least one hostname is required",
        ));
    }
    if config.allowed_hostnames.iter().any(|h| h.trim().is_empty()) {
        errors.push(ValidationError::new(
            "allowed_hostnames",
            "hostnames must not be empty",
        ));
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_requests",
            "must be greater than zero",
        ));
    }
    if config.rate_limit.window.is_zero() {
        errors.push(ValidationError::new(
            "rate_limit.window",
            "must be greater than zero",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.upstream_secs",
            "must be greater than zero when set",
        ));
    }

    // Hostnames such as "localhost" are resolved at bind time
    let host = &config.listener.host;
    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
        errors.push(ValidationError::new(
            "listener",
            format!("invalid bind address '{}'", config.listener.bind_address()),
        ));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("invalid socket address '{}'", addr),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
