//! Forwarding core.
//!
//! # Data Flow
//! ```text
//! ?url=...
//!     → validator.rs (required, parseable, http(s), host in allowlist)
//!     → security::headers (drop Host)
//!     → forward.rs (one upstream call, bounded redirects)
//!     → http::response (relay)
//! ```

pub mod forward;
pub mod validator;

pub use forward::{ForwardRequest, ForwardResponse, Forwarder};
pub use validator::{Allowlist, RejectReason, ValidationResult};
