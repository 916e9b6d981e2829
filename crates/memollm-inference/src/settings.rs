//! Persisted LLM settings record.
//!
//! Settings are stored as TOML. Every section is optional; a section that is
//! present causes the corresponding provider to be registered.
//!
//! ```toml
//! provider = "ollama"
//!
//! [openai]
//! api_key = "${OPENAI_API_KEY}"
//! default_model = "gpt-4o-mini"
//!
//! [ollama]
//! host = "http://localhost:11434"
//! ```
//!
//! `${VAR}` references are substituted from the environment before parsing;
//! unknown variables are left as written.

use std::env;
use std::fmt;
use std::path::Path;

use memollm_core::{ProviderConfig, ProviderType};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Settings load/save errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

impl From<SettingsError> for memollm_core::Error {
    fn from(e: SettingsError) -> Self {
        memollm_core::Error::Config(e.to_string())
    }
}

/// Section for a credential-based provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudProviderSettings {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub embedding_model: String,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_retries: u32,
}

/// Section for a self-hosted provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub embedding_model: String,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_retries: u32,
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// The full persisted record: preferred provider plus one section per family.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<CloudProviderSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<CloudProviderSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<CloudProviderSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaSettings>,
}

impl CloudProviderSettings {
    fn into_config(self, provider_type: ProviderType) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key,
            base_url: self.base_url,
            default_model: self.default_model,
            embedding_model: self.embedding_model,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            ..ProviderConfig::new(provider_type)
        }
    }

    fn from_config(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            default_model: config.default_model.clone(),
            embedding_model: config.embedding_model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

impl OllamaSettings {
    fn into_config(self) -> ProviderConfig {
        ProviderConfig {
            host: self.host,
            default_model: self.default_model,
            embedding_model: self.embedding_model,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            ..ProviderConfig::new(ProviderType::Ollama)
        }
    }

    fn from_config(config: &ProviderConfig) -> Self {
        Self {
            host: config.host.clone(),
            default_model: config.default_model.clone(),
            embedding_model: config.embedding_model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

impl LlmSettings {
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let content = substitute_env_vars(content);
        Ok(toml::from_str(&content)?)
    }

    pub fn from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> SettingsResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Apply `MEMOLLM_PROVIDER`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `GEMINI_API_KEY` and `OLLAMA_HOST`. A set variable creates its
    /// section when missing.
    pub fn apply_env_overrides(&mut self) -> SettingsResult<()> {
        if let Some(provider) = non_empty_env("MEMOLLM_PROVIDER") {
            self.provider = Some(
                provider
                    .parse()
                    .map_err(|_| SettingsError::InvalidProvider(provider.clone()))?,
            );
        }
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            self.openai.get_or_insert_with(Default::default).api_key = key;
        }
        if let Some(key) = non_empty_env("ANTHROPIC_API_KEY") {
            self.anthropic.get_or_insert_with(Default::default).api_key = key;
        }
        if let Some(key) = non_empty_env("GEMINI_API_KEY") {
            self.gemini.get_or_insert_with(Default::default).api_key = key;
        }
        if let Some(host) = non_empty_env("OLLAMA_HOST") {
            self.ollama.get_or_insert_with(Default::default).host = host;
        }
        Ok(())
    }

    /// Load from `path` when given and present, then apply env overrides.
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                info!(subsystem = "inference", path = %path.display(), "Loading LLM settings");
                Self::from_file(path)?
            }
            Some(path) => {
                debug!(
                    subsystem = "inference",
                    path = %path.display(),
                    "Settings file not found, using environment"
                );
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Provider configs for every section present, in type order.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        let mut configs = Vec::new();
        if let Some(s) = &self.openai {
            configs.push(s.clone().into_config(ProviderType::OpenAI));
        }
        if let Some(s) = &self.anthropic {
            configs.push(s.clone().into_config(ProviderType::Anthropic));
        }
        if let Some(s) = &self.gemini {
            configs.push(s.clone().into_config(ProviderType::Gemini));
        }
        if let Some(s) = &self.ollama {
            configs.push(s.clone().into_config());
        }
        configs
    }

    /// Store a provider config into its family's slot.
    pub fn set_provider_config(&mut self, config: &ProviderConfig) {
        match config.provider_type {
            ProviderType::OpenAI => self.openai = Some(CloudProviderSettings::from_config(config)),
            ProviderType::Anthropic => {
                self.anthropic = Some(CloudProviderSettings::from_config(config))
            }
            ProviderType::Gemini => self.gemini = Some(CloudProviderSettings::from_config(config)),
            ProviderType::Ollama => self.ollama = Some(OllamaSettings::from_config(config)),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Replace `${VAR}` with the variable's value; unknown variables stay as-is.
fn substitute_env_vars(content: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}

fn redacted(key: &str) -> &'static str {
    if key.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

impl fmt::Debug for CloudProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudProviderSettings")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("openai", &self.openai)
            .field("anthropic", &self.anthropic)
            .field("gemini", &self.gemini)
            .field("ollama", &self.ollama)
            .finish()
    }
}
