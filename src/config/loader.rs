//! Configuration loading from disk and secrets from the environment.
//!
//! The encryption key is the one fatal startup-time invariant: the process
//! refuses to start if `ENCRYPTION_KEY` is absent or is not exactly 64 hex
//! characters (32 bytes).

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the 32-byte hex encryption key.
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";

/// Environment variable holding the seeded admin password.
pub const ADMIN_PASSWORD_VAR: &str = "ADMIN_PASSWORD";

/// Error type for configuration loading. Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("{ENCRYPTION_KEY_VAR} is not set; generate one with `openssl rand -hex 32`")]
    MissingEncryptionKey,

    #[error("{ENCRYPTION_KEY_VAR} must be exactly 64 hex characters (32 bytes)")]
    MalformedEncryptionKey,
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file. A missing file yields
/// the defaults, so a bare deployment only needs the environment secrets.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        AppConfig::default()
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Secrets consumed from the environment at startup.
pub struct Secrets {
    /// 32-byte AES key, decoded from hex.
    pub encryption_key: [u8; 32],

    /// Admin password used for seeding. `None` keeps an existing hash.
    pub admin_password: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment, enforcing the key format.
    pub fn from_env() -> Result<Self, ConfigError> {
        let hex_key =
            std::env::var(ENCRYPTION_KEY_VAR).map_err(|_| ConfigError::MissingEncryptionKey)?;
        let encryption_key = decode_key(&hex_key)?;

        Ok(Self {
            encryption_key,
            admin_password: std::env::var(ADMIN_PASSWORD_VAR).ok(),
        })
    }
}

/// Decode and length-check a 64-hex-character key.
pub fn decode_key(hex_key: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|_| ConfigError::MalformedEncryptionKey)?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ConfigError::MalformedEncryptionKey)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/linkgate.toml")).unwrap();
        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.retention.days, 30);
    }

    #[test]
    fn decode_key_accepts_64_hex_chars() {
        let key = decode_key(&"ab".repeat(32)).unwrap();
        assert_eq!(key[0], 0xab);
    }

    #[test]
    fn decode_key_rejects_wrong_length_and_non_hex() {
        assert!(matches!(
            decode_key("deadbeef"),
            Err(ConfigError::MalformedEncryptionKey)
        ));
        assert!(matches!(
            decode_key(&"zz".repeat(32)),
            Err(ConfigError::MalformedEncryptionKey)
        ));
    }
}
