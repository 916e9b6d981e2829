//! API key helpers: display masking, per-provider format checks, stable ids.

use memollm_core::ProviderType;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// Replace every character except the last four with `*`.
///
/// Keys of four characters or fewer are fully masked.
pub fn mask_api_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = key.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), tail)
}

/// Check that a key has the shape the provider issues.
pub fn validate_api_key_format(provider: ProviderType, key: &str) -> CryptoResult<()> {
    if key.is_empty() {
        return Err(CryptoError::InvalidKeyFormat(
            "API key cannot be empty".to_string(),
        ));
    }

    match provider {
        ProviderType::OpenAI => {
            if !key.starts_with("sk-") {
                return Err(CryptoError::InvalidKeyFormat(
                    "OpenAI API keys should start with 'sk-'".to_string(),
                ));
            }
            if key.len() < 20 {
                return Err(CryptoError::InvalidKeyFormat(
                    "OpenAI API key appears too short".to_string(),
                ));
            }
        }
        ProviderType::Anthropic => {
            if !key.starts_with("sk-ant-") {
                return Err(CryptoError::InvalidKeyFormat(
                    "Anthropic API keys should start with 'sk-ant-'".to_string(),
                ));
            }
        }
        ProviderType::Gemini => {
            if key.len() < 20 {
                return Err(CryptoError::InvalidKeyFormat(
                    "Gemini API key appears too short".to_string(),
                ));
            }
        }
        ProviderType::Ollama => {}
    }
    Ok(())
}

/// First 4 bytes of SHA-256(key), hex encoded. Empty key yields an empty id.
pub fn generate_key_id(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..4])
}
