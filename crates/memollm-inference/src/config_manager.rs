//! Bridge between the persisted [`LlmSettings`] record and a live [`LlmService`].

use std::sync::Arc;

use memollm_core::{Error, ProviderType, Result};
use tracing::{debug, info, warn};

use crate::factory::create_provider;
use crate::service::LlmService;
use crate::settings::LlmSettings;

/// Replacement order when the preferred provider cannot be used.
pub const FALLBACK_ORDER: [ProviderType; 4] = [
    ProviderType::Ollama,
    ProviderType::OpenAI,
    ProviderType::Anthropic,
    ProviderType::Gemini,
];

pub struct ConfigManager {
    service: Arc<LlmService>,
}

impl ConfigManager {
    pub fn new(service: Arc<LlmService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<LlmService> {
        &self.service
    }

    /// Register a provider for every section in `settings`, then activate
    /// the preferred provider (or a fallback).
    ///
    /// A section whose provider cannot be built is skipped with a warning.
    /// Failing to find any usable provider is logged, not returned.
    pub fn load_settings(&self, settings: &LlmSettings) -> Result<()> {
        for config in settings.provider_configs() {
            let provider_type = config.provider_type;
            match create_provider(config) {
                Ok(provider) => self.service.register_provider(provider)?,
                Err(e) => warn!(
                    subsystem = "inference",
                    component = "config",
                    provider = %provider_type,
                    error = %e,
                    "Failed to build provider from settings"
                ),
            }
        }

        if let Some(preferred) = settings.provider {
            if let Err(e) = self.set_active_provider_with_fallback(preferred) {
                warn!(
                    subsystem = "inference",
                    component = "config",
                    provider = %preferred,
                    error = %e,
                    "No usable LLM provider after loading settings"
                );
            }
        } else {
            debug!(
                subsystem = "inference",
                component = "config",
                "No preferred provider in settings"
            );
        }
        Ok(())
    }

    /// Snapshot every registered provider back into a settings record.
    pub fn to_settings(&self) -> LlmSettings {
        let mut settings = LlmSettings {
            provider: self.service.active_provider_type(),
            ..Default::default()
        };
        for provider_type in self.service.registered_types() {
            if let Ok(provider) = self.service.provider(provider_type) {
                settings.set_provider_config(provider.config());
            }
        }
        settings
    }

    /// Activate `preferred` if it is registered and configured; otherwise
    /// activate the first configured provider in [`FALLBACK_ORDER`].
    pub fn set_active_provider_with_fallback(&self, preferred: ProviderType) -> Result<ProviderType> {
        if let Ok(provider) = self.service.provider(preferred) {
            if provider.is_configured() {
                self.service.set_active_provider(preferred)?;
                return Ok(preferred);
            }
        }

        let statuses = self.service.list_providers();
        let replacement = FALLBACK_ORDER.into_iter().find(|ty| {
            statuses
                .iter()
                .any(|s| s.provider_type == *ty && s.configured)
        });

        match replacement {
            Some(replacement) => {
                self.service.set_active_provider(replacement)?;
                warn!(
                    subsystem = "inference",
                    component = "config",
                    requested = %preferred,
                    provider = %replacement,
                    "Requested provider unavailable, using fallback"
                );
                Ok(replacement)
            }
            None => {
                info!(
                    subsystem = "inference",
                    component = "config",
                    requested = %preferred,
                    "No configured provider available"
                );
                Err(Error::NoFallbackProvider)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::settings::{CloudProviderSettings, OllamaSettings};

    fn manager_with(mocks: Vec<MockProvider>) -> ConfigManager {
        let service = Arc::new(LlmService::new());
        for mock in mocks {
            service.register_provider(Arc::new(mock)).unwrap();
        }
        ConfigManager::new(service)
    }

    #[test]
    fn test_fallback_to_local_provider() {
        let manager = manager_with(vec![MockProvider::of_type(ProviderType::Ollama)]);
        let chosen = manager
            .set_active_provider_with_fallback(ProviderType::OpenAI)
            .unwrap();
        assert_eq!(chosen, ProviderType::Ollama);
        assert_eq!(
            manager.service().active_provider_type(),
            Some(ProviderType::Ollama)
        );
    }

    #[test]
    fn test_preferred_provider_wins_when_configured() {
        let manager = manager_with(vec![
            MockProvider::of_type(ProviderType::Ollama),
            MockProvider::of_type(ProviderType::Gemini),
        ]);
        let chosen = manager
            .set_active_provider_with_fallback(ProviderType::Gemini)
            .unwrap();
        assert_eq!(chosen, ProviderType::Gemini);
    }

    #[test]
    fn test_unconfigured_preference_falls_back_in_order() {
        let manager = manager_with(vec![
            MockProvider::of_type(ProviderType::Gemini),
            MockProvider::of_type(ProviderType::Anthropic),
            MockProvider::of_type(ProviderType::OpenAI).unconfigured(),
        ]);
        let chosen = manager
            .set_active_provider_with_fallback(ProviderType::OpenAI)
            .unwrap();
        assert_eq!(chosen, ProviderType::Anthropic);
    }

    #[test]
    fn test_no_configured_provider_is_an_error() {
        let manager = manager_with(vec![MockProvider::of_type(ProviderType::OpenAI).unconfigured()]);
        let err = manager
            .set_active_provider_with_fallback(ProviderType::OpenAI)
            .unwrap_err();
        assert!(matches!(err, Error::NoFallbackProvider));
    }

    #[test]
    fn test_load_settings_registers_sections_and_activates() {
        let manager = ConfigManager::new(Arc::new(LlmService::new()));
        let settings = LlmSettings {
            provider: Some(ProviderType::Anthropic),
            openai: Some(CloudProviderSettings {
                api_key: "sk-openai".to_string(),
                ..Default::default()
            }),
            anthropic: Some(CloudProviderSettings {
                api_key: "sk-ant-key".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        manager.load_settings(&settings).unwrap();
        let service = manager.service();
        assert_eq!(
            service.registered_types(),
            vec![ProviderType::OpenAI, ProviderType::Anthropic]
        );
        assert_eq!(service.active_provider_type(), Some(ProviderType::Anthropic));
    }

    #[test]
    fn test_load_settings_with_missing_preference_uses_fallback() {
        let manager = ConfigManager::new(Arc::new(LlmService::new()));
        let settings = LlmSettings {
            provider: Some(ProviderType::Gemini),
            ollama: Some(OllamaSettings::default()),
            ..Default::default()
        };
        manager.load_settings(&settings).unwrap();
        assert_eq!(
            manager.service().active_provider_type(),
            Some(ProviderType::Ollama)
        );
    }

    #[test]
    fn test_to_settings_round_trip() {
        let manager = ConfigManager::new(Arc::new(LlmService::new()));
        let settings = LlmSettings {
            provider: Some(ProviderType::OpenAI),
            openai: Some(CloudProviderSettings {
                api_key: "sk-openai".to_string(),
                default_model: "gpt-4o".to_string(),
                ..Default::default()
            }),
            ollama: Some(OllamaSettings {
                host: "http://gpu:11434".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        manager.load_settings(&settings).unwrap();

        let saved = manager.to_settings();
        assert_eq!(saved.provider, Some(ProviderType::OpenAI));
        let openai = saved.openai.unwrap();
        assert_eq!(openai.api_key, "sk-openai");
        assert_eq!(openai.default_model, "gpt-4o");
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
        assert_eq!(saved.ollama.unwrap().host, "http://gpu:11434");
        assert!(saved.anthropic.is_none());
    }
}
