//! Background maintenance tasks.
//!
//! # Data Flow
//! ```text
//! cleanup.rs  (every 5 min): prune rate-window samples past retention,
//!             drop expired automatic blocks, drop expired sessions
//! anonymize.rs (daily):      redact sealed records past the retention period
//! ```
//!
//! # Design Decisions
//! - Each sweep is an explicit task with a synchronous `run_once`/`sweep`
//!   entry point, so tests never wait on wall-clock timers
//! - Loops subscribe to the shutdown broadcast and exit between ticks
//! - A failed tick is logged and retried on the next tick; it never kills
//!   the scheduler
//! - Sweeps run off the hot path: request latency is never coupled to
//!   table-scan cost

pub mod anonymize;
pub mod cleanup;

pub use anonymize::Anonymizer;
pub use cleanup::CleanupTask;
