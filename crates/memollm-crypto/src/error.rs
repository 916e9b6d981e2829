//! Error types for vault and key encryption operations.

use memollm_core::ProviderType;
use thiserror::Error;

/// Vault and key encryption errors. None of these are retried.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Master secret shorter than the minimum.
    #[error("Master key too short (minimum {0} characters required)")]
    KeyTooShort(usize),

    /// Ciphertext shorter than a nonce.
    #[error("Invalid ciphertext")]
    InvalidCiphertext,

    /// Stored blob is not valid base64.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key or corrupted data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Decrypted bytes are not UTF-8.
    #[error("Decrypted key is not valid UTF-8")]
    InvalidUtf8,

    /// API key does not match the provider's expected shape.
    #[error("Invalid API key format: {0}")]
    InvalidKeyFormat(String),

    #[error("API key not found for user {user_id} and provider {provider}")]
    KeyNotFound { user_id: i32, provider: ProviderType },

    #[error("API key already exists for user {user_id} and provider {provider}")]
    KeyAlreadyExists { user_id: i32, provider: ProviderType },

    /// Missing or unusable process configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (poisoned lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for vault and key encryption operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
