//! Provider identity and per-instance configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::Error;

// =============================================================================
// PROVIDER TYPE
// =============================================================================

/// Closed set of supported LLM backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
}

impl ProviderType {
    /// Every provider type, in declaration order.
    pub const ALL: [ProviderType; 4] = [
        ProviderType::OpenAI,
        ProviderType::Anthropic,
        ProviderType::Gemini,
        ProviderType::Ollama,
    ];

    /// Stable string tag used in settings files and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    /// Human-readable name shown in provider listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Google Gemini",
            Self::Ollama => "Ollama",
        }
    }

    /// Self-hosted backends authenticate by reachability, not by credential.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(Error::InvalidInput(format!("unknown provider type: {}", s))),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROVIDER CONFIG
// =============================================================================

/// Configuration for one provider instance.
///
/// Empty string fields and zero numeric fields mean "use the default for this
/// provider type"; [`ProviderConfig::resolved`] fills them in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub embedding_model: String,
    /// Host URL for self-hosted providers.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl ProviderConfig {
    /// Bare config carrying only the type; everything else falls back to defaults.
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: String::new(),
            base_url: String::new(),
            default_model: String::new(),
            embedding_model: String::new(),
            host: String::new(),
            timeout_secs: 0,
            max_retries: 0,
        }
    }

    /// Fully populated defaults for a provider type (no credential).
    pub fn with_defaults(provider_type: ProviderType) -> Self {
        Self::new(provider_type).resolved()
    }

    /// Fill every empty field with the default for this provider type.
    pub fn resolved(mut self) -> Self {
        let (base_url, model, embed) = match self.provider_type {
            ProviderType::OpenAI => (
                defaults::OPENAI_BASE_URL,
                defaults::OPENAI_MODEL,
                defaults::OPENAI_EMBED_MODEL,
            ),
            ProviderType::Anthropic => (defaults::ANTHROPIC_BASE_URL, defaults::ANTHROPIC_MODEL, ""),
            ProviderType::Gemini => (
                defaults::GEMINI_BASE_URL,
                defaults::GEMINI_MODEL,
                defaults::GEMINI_EMBED_MODEL,
            ),
            ProviderType::Ollama => ("", defaults::OLLAMA_MODEL, defaults::OLLAMA_EMBED_MODEL),
        };

        if self.provider_type.is_local() {
            if self.host.is_empty() {
                self.host = defaults::OLLAMA_HOST.to_string();
            }
        } else if self.base_url.is_empty() {
            self.base_url = base_url.to_string();
        }
        if self.default_model.is_empty() {
            self.default_model = model.to_string();
        }
        if self.embedding_model.is_empty() {
            self.embedding_model = embed.to_string();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = defaults::TIMEOUT_SECS;
        }
        if self.max_retries == 0 {
            self.max_retries = defaults::MAX_RETRIES;
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// HTTP client timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(if self.timeout_secs == 0 {
            defaults::TIMEOUT_SECS
        } else {
            self.timeout_secs
        })
    }

    /// The URL requests are sent to: `host` for local providers, `base_url` otherwise.
    pub fn endpoint(&self) -> &str {
        if self.provider_type.is_local() {
            &self.host
        } else {
            &self.base_url
        }
    }

    /// Field-presence check: credential for cloud providers, host for local ones.
    pub fn has_credentials(&self) -> bool {
        if self.provider_type.is_local() {
            !self.host.is_empty()
        } else {
            !self.api_key.is_empty()
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("api_key", &api_key)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

// =============================================================================
// PROVIDER STATUS
// =============================================================================

/// Point-in-time view of a registered provider, rebuilt on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub name: String,
    pub configured: bool,
    pub active: bool,
    pub default_model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_round_trips_through_str() {
        for ty in ProviderType::ALL {
            assert_eq!(ty.as_str().parse::<ProviderType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_provider_type_parse_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!(" ollama ".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
        assert!("mistral".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_provider_type_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&ProviderType::OpenAI).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: ProviderType = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, ProviderType::Anthropic);
    }

    #[test]
    fn test_resolved_fills_cloud_defaults() {
        let config = ProviderConfig::new(ProviderType::OpenAI).resolved();
        assert_eq!(config.base_url, defaults::OPENAI_BASE_URL);
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.host.is_empty());
    }

    #[test]
    fn test_resolved_keeps_overrides() {
        let config = ProviderConfig::new(ProviderType::Gemini)
            .with_base_url("http://proxy.local")
            .with_default_model("gemini-pro")
            .with_max_retries(1)
            .resolved();
        assert_eq!(config.base_url, "http://proxy.local");
        assert_eq!(config.default_model, "gemini-pro");
        assert_eq!(config.embedding_model, "text-embedding-004");
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_resolved_fills_local_host() {
        let config = ProviderConfig::new(ProviderType::Ollama).resolved();
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.endpoint(), "http://localhost:11434");
        assert!(config.base_url.is_empty());
    }

    #[test]
    fn test_has_credentials_is_field_presence() {
        assert!(!ProviderConfig::with_defaults(ProviderType::OpenAI).has_credentials());
        assert!(ProviderConfig::with_defaults(ProviderType::OpenAI)
            .with_api_key("sk-x")
            .has_credentials());
        assert!(ProviderConfig::with_defaults(ProviderType::Ollama).has_credentials());
        assert!(!ProviderConfig::new(ProviderType::Ollama).has_credentials());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new(ProviderType::Anthropic).with_api_key("sk-ant-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_status_serializes_type_field() {
        let status = ProviderStatus {
            provider_type: ProviderType::Ollama,
            name: "Ollama".to_string(),
            configured: true,
            active: false,
            default_model: "llama3.2".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "ollama");
    }
}
