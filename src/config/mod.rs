//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, defaults when absent)
//!     → validation.rs (semantic checks, all errors collected)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! environment (secrets only)
//!     → loader.rs (ENCRYPTION_KEY fatal check, ADMIN_PASSWORD)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Secrets never live in the config file
//! - A malformed encryption key terminates startup, never occurs mid-run

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Secrets};
pub use schema::{AppConfig, RateLimitConfig, RetentionConfig};
