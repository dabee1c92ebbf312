//! Header sanitization for forwarded requests and relayed responses.
//!
//! # Responsibilities
//! - Drop the inbound `Host` header before forwarding
//! - Strip hop-by-hop headers on both legs
//! - Drop upstream CORS headers so the proxy's CORS layer is authoritative
//!
//! # Design Decisions
//! - Never mutate the inbound map in `sanitize`; build a fresh one
//! - `HeaderMap` keys are already case-insensitive
//! - Multi-valued headers keep all values, in order

use axum::http::{header, HeaderMap, HeaderName};

/// Hop-by-hop headers plus `content-length`, which the outbound
/// transport recomputes from the body it actually sends.
pub const TRANSPORT_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Return a copy of `headers` without `host`. Absent stays absent.
pub fn sanitize(headers: Option<&HeaderMap>) -> Option<HeaderMap> {
    let headers = headers?;
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if name == header::HOST {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    Some(out)
}

/// Remove headers that only make sense for a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in TRANSPORT_HEADERS {
        headers.remove(*name);
    }
}

/// Remove `access-control-*` headers from an upstream response.
pub fn strip_cors(headers: &mut HeaderMap) {
    let cors: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("access-control-"))
        .cloned()
        .collect();
    for name in cors {
        headers.remove(name);
    }
}
