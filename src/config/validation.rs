//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, retention covers the window)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.auto_block_secs must be greater than zero")]
    ZeroAutoBlock,

    #[error("rate_limit.sample_retention_secs ({retention}) must cover the window ({window})")]
    RetentionBelowWindow { retention: u64, window: u64 },

    #[error("retention.days must be greater than zero")]
    ZeroRetentionDays,

    #[error("session.ttl_secs must be greater than zero")]
    ZeroSessionTtl,

    #[error("admin.username must not be empty")]
    EmptyAdminUsername,
}

/// Validate a loaded configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let rl = &config.rate_limit;
    if rl.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if rl.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if rl.auto_block_secs == 0 {
        errors.push(ValidationError::ZeroAutoBlock);
    }
    if rl.sample_retention_secs < rl.window_secs {
        errors.push(ValidationError::RetentionBelowWindow {
            retention: rl.sample_retention_secs,
            window: rl.window_secs,
        });
    }

    if config.retention.days == 0 {
        errors.push(ValidationError::ZeroRetentionDays);
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    }
    if config.admin.username.trim().is_empty() {
        errors.push(ValidationError::EmptyAdminUsername);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.window_secs = 0;
        config.rate_limit.max_requests = 0;
        config.retention.days = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn sample_retention_must_cover_window() {
        let mut config = AppConfig::default();
        config.rate_limit.window_secs = 120;
        config.rate_limit.sample_retention_secs = 60;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::RetentionBelowWindow { retention: 60, window: 120 }
        ));
    }
}
