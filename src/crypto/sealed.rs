//! Authenticated encryption of PII payloads.
//!
//! Seals arbitrary UTF-8 with AES-256-GCM (96-bit nonce, 128-bit tag) and
//! stores the three parts hex-encoded so the row store only ever sees text.
//! The triple belongs together: mixing the iv or tag from another seal call
//! is undecryptable by construction.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GCM tag length in bytes.
const TAG_LEN: usize = 16;

/// GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The cipher rejected the seal operation. Practically unreachable with
    /// a valid key, but never worth a panic on the request path.
    #[error("seal operation failed")]
    Seal,

    /// Tag verification failed or the stored parts are malformed. Expected
    /// for anonymized or corrupted rows; callers render a placeholder.
    #[error("decryption failed")]
    Decryption,
}

/// The hex-encoded output of one seal call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedParts {
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
}

/// Process-wide codec holding the AEAD cipher.
pub struct SealedCodec {
    cipher: Aes256Gcm,
}

impl SealedCodec {
    /// Build the codec from the operator-supplied 32-byte key. Key format
    /// is enforced earlier, at configuration load.
    pub fn new(key: [u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        Self { cipher }
    }

    /// Encrypt `plaintext`, drawing a fresh random nonce. Nonce generation
    /// goes straight to the OS RNG, so concurrent seal calls cannot collide
    /// through shared state.
    pub fn seal(&self, plaintext: &str) -> Result<SealedParts, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Seal)?;

        // RustCrypto appends the tag to the ciphertext; store them apart.
        let split = sealed.len() - TAG_LEN;
        Ok(SealedParts {
            ciphertext: hex::encode(&sealed[..split]),
            iv: hex::encode(nonce),
            tag: hex::encode(&sealed[split..]),
        })
    }

    /// Decrypt a stored triple. Any malformation or tag mismatch yields
    /// `CryptoError::Decryption`; partial plaintext is never exposed.
    pub fn open(&self, parts: &SealedParts) -> Result<String, CryptoError> {
        let ciphertext = hex::decode(&parts.ciphertext).map_err(|_| CryptoError::Decryption)?;
        let iv = hex::decode(&parts.iv).map_err(|_| CryptoError::Decryption)?;
        let tag = hex::decode(&parts.tag).map_err(|_| CryptoError::Decryption)?;

        if iv.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::Decryption);
        }

        let mut buffer = ciphertext;
        buffer.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), buffer.as_ref())
            .map_err(|_| CryptoError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
    }
}
