//! Cryptography subsystem.
//!
//! # Design Decisions
//! - AES-256-GCM for PII at rest: standard AEAD, no custom primitives
//! - One key for the process lifetime, loaded and checked at startup
//! - Fresh OS-random nonce per seal call, never a shared counter
//! - Failed opens are an expected steady state (anonymized rows), reported
//!   as a distinct error the caller renders as a placeholder

pub mod password;
pub mod sealed;

pub use sealed::{CryptoError, SealedCodec, SealedParts};
