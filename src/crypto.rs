//! Field-level encryption for stored credential passwords.
//!
//! Ciphertext layout is `base64(nonce || aes-256-gcm(ciphertext + tag))` with a
//! fresh 96-bit nonce per encryption.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::fmt;

use crate::error::VaultError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct PasswordCodec {
    cipher: Aes256Gcm,
}

impl fmt::Debug for PasswordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCodec").finish_non_exhaustive()
    }
}

impl PasswordCodec {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Parse a base64 key as found in configuration. Accepts an optional `base64:` prefix.
    pub fn from_base64_key(encoded: &str) -> Result<Self, VaultError> {
        let trimmed = encoded.trim();
        let trimmed = trimmed.strip_prefix("base64:").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VaultError::Config("encryption_key is not set".to_string()));
        }
        let raw = STANDARD
            .decode(trimmed)
            .map_err(|e| VaultError::Config(format!("encryption_key is not valid base64: {e}")))?;
        let key: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            VaultError::Config(format!(
                "encryption_key must decode to {KEY_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self::new(&key))
    }

    /// Encrypt a password. Absent and empty values stay absent.
    pub fn encode(&self, plaintext: Option<&str>) -> Result<Option<String>, VaultError> {
        let Some(plaintext) = plaintext.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Config("password encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(Some(STANDARD.encode(out)))
    }

    /// Decrypt a stored password. Malformed input or a key mismatch is a hard error.
    pub fn decode(&self, ciphertext: Option<&str>) -> Result<Option<String>, VaultError> {
        let Some(ciphertext) = ciphertext else {
            return Ok(None);
        };
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| VaultError::Decode(format!("invalid base64: {e}")))?;
        if raw.len() <= NONCE_LEN {
            return Err(VaultError::Decode("ciphertext too short".to_string()));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| VaultError::Decode("authentication failed".to_string()))?;
        let plain = String::from_utf8(plain)
            .map_err(|_| VaultError::Decode("plaintext is not valid UTF-8".to_string()))?;
        Ok(Some(plain))
    }
}
