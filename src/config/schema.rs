//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Every field has a default so a minimal (or absent) config works.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Database location.
    pub database: DatabaseConfig,

    /// Rate limiting and auto-block settings.
    pub rate_limit: RateLimitConfig,

    /// PII retention and anonymization settings.
    pub retention: RetentionConfig,

    /// Session settings.
    pub session: SessionConfig,

    /// Admin account settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data.db".to_string(),
        }
    }
}

/// Sliding-window rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Trailing window length in seconds.
    pub window_secs: u64,

    /// Maximum requests admitted per IP within the window.
    pub max_requests: u32,

    /// Lifetime of an automatic block once the quota is breached.
    pub auto_block_secs: u64,

    /// How long raw window samples are kept before the cleanup sweep
    /// removes them. Must be at least as long as the window.
    pub sample_retention_secs: u64,

    /// Interval between cleanup sweeps.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 50,
            auto_block_secs: 3600,
            sample_retention_secs: 300,
            cleanup_interval_secs: 300,
        }
    }
}

/// PII retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Records older than this many days are anonymized.
    pub days: u32,

    /// Interval between anonymization sweeps.
    pub sweep_interval_secs: u64,

    /// Delay before the first sweep after startup.
    pub startup_delay_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: 30,
            sweep_interval_secs: 24 * 60 * 60,
            startup_delay_secs: 3,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 2 * 60 * 60,
        }
    }
}

/// Admin account configuration. The password comes from the environment,
/// never from the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Username seeded at startup.
    pub username: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
        }
    }
}
