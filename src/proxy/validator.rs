//! Target URL validation.
//!
//! # Responsibilities
//! - Require the `url` query parameter
//! - Parse it as an absolute http(s) URL
//! - Match the parsed hostname against the allowlist (exact match)
//!
//! # Design Decisions
//! - Hostname matching is exact; allowlist entries are not normalized
//! - The URL parser lowercases ASCII hostnames of http(s) URLs
//! - No wildcards, no suffix matching
//! - Pure: no I/O, no shared mutable state

use std::collections::HashSet;
use std::sync::Arc;

use url::Url;

/// Why a target URL was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingUrl,
    MalformedUrl,
    HostnameNotAllowed,
}

/// Outcome of validating a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The parsed target, ready to forward.
    Allowed(Url),
    Rejected(RejectReason),
}

impl ValidationResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Convert into a `Result` for `?` propagation in handlers.
    pub fn into_result(self) -> Result<Url, RejectReason> {
        match self {
            Self::Allowed(url) => Ok(url),
            Self::Rejected(reason) => Err(reason),
        }
    }
}

/// Immutable set of hostnames the proxy may forward to.
///
/// Cheap to clone; the set itself is shared.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    hosts: Arc<HashSet<String>>,
}

impl Allowlist {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: Arc::new(hosts.into_iter().map(Into::into).collect()),
        }
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.contains(hostname)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Validate a raw target URL as received in the query string.
    pub fn validate(&self, raw_url: Option<&str>) -> ValidationResult {
        let raw_url = match raw_url {
            Some(s) if !s.is_empty() => s,
            _ => return ValidationResult::Rejected(RejectReason::MissingUrl),
        };

        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(error = %e, "Target url failed to parse");
                return ValidationResult::Rejected(RejectReason::MalformedUrl);
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            return ValidationResult::Rejected(RejectReason::MalformedUrl);
        }

        let hostname = match url.host_str() {
            Some(h) => h,
            None => return ValidationResult::Rejected(RejectReason::MalformedUrl),
        };

        if !self.contains(hostname) {
            return ValidationResult::Rejected(RejectReason::HostnameNotAllowed);
        }

        ValidationResult::Allowed(url)
    }
}
