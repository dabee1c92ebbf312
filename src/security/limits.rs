//! Request body limits.
//!
//! # Design Decisions
//! - A declared `Content-Length` over the cap is refused before reading
//! - Chunked bodies are counted while buffering and refused once over
//! - Over-limit bodies return 413 Payload Too Large

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap},
};
use futures_util::StreamExt;

use crate::error::ProxyError;

/// Buffer `body`, refusing anything larger than `max_bytes`.
pub async fn read_body(headers: &HeaderMap, body: Body, max_bytes: usize) -> Result<Bytes, ProxyError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_bytes) {
        return Err(ProxyError::BodyTooLarge);
    }

    let mut buf = Vec::with_capacity(declared.unwrap_or(0));
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            ProxyError::BodyRead
        })?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(ProxyError::BodyTooLarge);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}
