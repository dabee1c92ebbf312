//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, handlers)
//!     → request.rs (request ID, tracing span)
//!     → [rate limit gate, url validation, header sanitization]
//!     → proxy::forward (upstream call)
//!     → response.rs (relay status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
