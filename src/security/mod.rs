//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (admission gate, global or per-IP windows)
//!     → limits.rs (cap the buffered request body)
//!     → headers.rs (drop Host, strip hop-by-hop)
//!     → Pass to the forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod limits;
pub mod rate_limit;
