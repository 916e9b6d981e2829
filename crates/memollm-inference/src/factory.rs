//! Construct a provider from its configuration.

use std::sync::Arc;

use memollm_core::{LlmProvider, ProviderConfig, ProviderType, Result};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAIProvider;

/// Build the backend matching `config.provider_type`.
pub fn create_provider(config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderType::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderType::Ollama => Arc::new(OllamaProvider::new(config)?),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_every_type() {
        for ty in ProviderType::ALL {
            let provider = create_provider(ProviderConfig::new(ty)).unwrap();
            assert_eq!(provider.provider_type(), ty);
            assert!(!provider.default_model().is_empty());
        }
    }

    #[test]
    fn test_factory_passes_credentials_through() {
        let provider =
            create_provider(ProviderConfig::new(ProviderType::Anthropic).with_api_key("sk-ant-x"))
                .unwrap();
        assert!(provider.is_configured());
        assert_eq!(provider.config().api_key, "sk-ant-x");
    }
}
