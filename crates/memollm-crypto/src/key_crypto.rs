//! AES-256-GCM encryption of API keys under a master secret.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Minimum master secret length, in characters.
pub const MIN_MASTER_KEY_LENGTH: usize = 16;

/// Environment variable holding the master secret.
pub const MASTER_KEY_ENV: &str = "MEMOLLM_MASTER_KEY";

const NONCE_LEN: usize = 12;

/// 256-bit encryption key, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; 32],
}

impl MasterKey {
    /// Derive the key as SHA-256 of the master secret.
    pub fn derive(master_secret: &str) -> CryptoResult<Self> {
        if master_secret.chars().count() < MIN_MASTER_KEY_LENGTH {
            return Err(CryptoError::KeyTooShort(MIN_MASTER_KEY_LENGTH));
        }
        let digest = Sha256::digest(master_secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts and decrypts API keys for storage.
///
/// Output format is `base64(nonce ‖ ciphertext ‖ tag)`. Empty input maps to
/// empty output in both directions.
#[derive(Debug)]
pub struct KeyCrypto {
    key: MasterKey,
}

impl KeyCrypto {
    pub fn new(master_secret: &str) -> CryptoResult<Self> {
        Ok(Self {
            key: MasterKey::derive(master_secret)?,
        })
    }

    /// Build from the `MEMOLLM_MASTER_KEY` environment variable.
    pub fn from_env() -> CryptoResult<Self> {
        let secret = std::env::var(MASTER_KEY_ENV)
            .map_err(|_| CryptoError::Config(format!("{} is not set", MASTER_KEY_ENV)))?;
        Self::new(&secret)
    }

    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&sealed);
        Ok(base64::engine::general_purpose::STANDARD.encode(envelope))
    }

    pub fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let envelope = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::InvalidBase64(e.to_string()))?;
        if envelope.len() < NONCE_LEN {
            return Err(CryptoError::InvalidCiphertext);
        }

        let (nonce, sealed) = envelope.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decryption("AES-GCM decryption failed".into()))?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    fn cipher(&self) -> CryptoResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }
}
