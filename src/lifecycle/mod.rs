//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → broadcast to: HTTP server (drain), cleanup task, anonymizer task
//!     → store checkpoint, exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every long-running task
//! - Background sweeps are short and bounded; they finish the current tick
//!   rather than cancelling mid-batch

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
