//! Response relay.
//!
//! # Responsibilities
//! - Turn the upstream response into the client response
//! - Keep upstream status and body verbatim, 2xx or not
//! - Strip hop-by-hop and upstream CORS headers
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Framing headers are recomputed by the server for the client leg

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};

use crate::proxy::forward::ForwardResponse;
use crate::security::headers::{strip_cors, strip_hop_by_hop};

impl From<reqwest::Response> for ForwardResponse {
    fn from(upstream: reqwest::Response) -> Self {
        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        strip_cors(&mut headers);

        Self {
            status,
            headers,
            body: Body::from_stream(upstream.bytes_stream()),
        }
    }
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
