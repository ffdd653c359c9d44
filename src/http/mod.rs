//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware wiring, shared state)
//!     → security middleware (rate limit → CSRF → sanitized body)
//!     → generate.rs (public link generation) or admin handlers
//!     → JSON response
//! ```

pub mod generate;
pub mod server;
pub mod validate;

pub use server::{AppState, HttpServer};
