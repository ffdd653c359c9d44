//! Guarded link-generation service library.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                    LINKGATE                      │
//!                 │                                                  │
//!  Request ───────┼─▶ security (block list → rate limit → CSRF) ─┐   │
//!                 │                                              ▼   │
//!                 │            http (generate) / admin handlers      │
//!                 │                       │                          │
//!                 │          crypto (seal PII)  session (TTL map)    │
//!                 │                       │                          │
//!                 │                     store (SQLite)               │
//!                 │                       ▲                          │
//!                 │   maintenance (cleanup, anonymize) ──────────┘   │
//!                 │                                                  │
//!                 │   Cross-cutting: config, error, lifecycle        │
//!                 └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod crypto;
pub mod http;
pub mod store;

// Request protection
pub mod security;
pub mod session;

// Admin surface
pub mod admin;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod maintenance;

pub use config::AppConfig;
pub use error::AppError;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
