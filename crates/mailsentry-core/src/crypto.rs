//! Token encryption at rest.
//!
//! `OAuth2` tokens are encrypted with AES-256-GCM before they reach the
//! database. The key is supplied externally (base64, 32 bytes) and loaded at
//! process start; its absence is a fatal configuration error. Stored format
//! is `base64(nonce || ciphertext)`.

use aes_gcm::aead::{Aead, KeyInit, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Encryption errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material is missing or not a valid 32-byte base64 string.
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or corrupted ciphertext).
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Stored ciphertext is malformed.
    #[error("Invalid encrypted data format: {0}")]
    InvalidFormat(String),
}

/// Symmetric cipher for token storage.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Creates a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, not base64, or the wrong size.
    pub fn from_key(encoded_key: &str) -> Result<Self, CryptoError> {
        if encoded_key.is_empty() {
            return Err(CryptoError::InvalidKey("key is empty".to_string()));
        }

        let key_bytes = BASE64
            .decode(encoded_key)
            .map_err(|e| CryptoError::InvalidKey(format!("key is not valid base64: {e}")))?;

        let key: [u8; 32] = key_bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidKey(format!("key must be 32 bytes, got {}", v.len()))
        })?;

        Ok(Self {
            cipher: Aes256Gcm::new(&key.into()),
        })
    }

    /// Generates a fresh random key, base64-encoded, for operator setup.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypts a plaintext token.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input or a cipher failure.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Err(CryptoError::Encryption(
                "cannot encrypt empty token".to_string(),
            ));
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    /// Decrypts a stored token.
    ///
    /// # Errors
    ///
    /// Returns an error when the envelope is malformed or authentication
    /// fails — corrupted state or a rotated key, never silently recoverable.
    pub fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        if encrypted.is_empty() {
            return Err(CryptoError::InvalidFormat(
                "cannot decrypt empty string".to_string(),
            ));
        }

        let combined = BASE64
            .decode(encrypted)
            .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64: {e}")))?;

        if combined.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidFormat(format!(
                "encrypted data too short: {} bytes",
                combined.len()
            )));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self.cipher.decrypt(nonce, ciphertext).map_err(|e| {
            CryptoError::Decryption(format!(
                "AES-GCM decryption failed (wrong key or corrupted data): {e}"
            ))
        })?;

        String::from_utf8(plaintext_bytes)
            .map_err(|e| CryptoError::Decryption(format!("decrypted data is not UTF-8: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::from_key(&TokenCipher::generate_key()).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let c = cipher();
        let encrypted = c.encrypt("ya29.a0AfH6SMBx").unwrap();
        assert_ne!(encrypted, "ya29.a0AfH6SMBx");
        assert_eq!(c.decrypt(&encrypted).unwrap(), "ya29.a0AfH6SMBx");
    }

    #[test]
    fn same_plaintext_different_ciphertext() {
        let c = cipher();
        let e1 = c.encrypt("token").unwrap();
        let e2 = c.encrypt("token").unwrap();
        assert_ne!(e1, e2);
    }

    #[test]
    fn empty_plaintext_fails() {
        assert!(cipher().encrypt("").is_err());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encrypted = cipher().encrypt("secret").unwrap();
        let other = cipher();
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let c = cipher();
        assert!(c.decrypt("not_base64!@#").is_err());
        assert!(c.decrypt(&BASE64.encode("short")).is_err());
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(TokenCipher::from_key("").is_err());
        assert!(TokenCipher::from_key("AAAA").is_err());
        assert!(TokenCipher::from_key("!!!").is_err());
    }
}
