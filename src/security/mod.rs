//! Request-protection subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (block-list check, then sliding-window admission)
//!     → csrf.rs (double-submit token check on state-changing methods)
//!     → sanitize.rs (escape string leaves of JSON bodies)
//!     → headers.rs (security response headers)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: any guard failure rejects the request
//! - Denials are control flow, not faults: they map to 403/429 responses
//! - The block-list check runs first because it is the cheapest rejection

pub mod csrf;
pub mod headers;
pub mod rate_limit;
pub mod sanitize;

pub use csrf::CsrfGuard;
pub use rate_limit::{Admission, DenyReason, SlidingWindowLimiter};
