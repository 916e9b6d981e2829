use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{
    defaults, CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderConfig, ProviderType, Result, SuggestTagsRequest, SuggestTagsResponse,
    SummarizeRequest, SummarizeResponse, TokenUsage,
};
use tracing::{debug, instrument};

use super::types::{self, ChatCompletionRequest, ChatMessage};
use crate::tasks;
use crate::transport::{decode, HttpTransport};

/// OpenAI-compatible provider.
pub struct OpenAIProvider {
    config: ProviderConfig,
    transport: HttpTransport,
}

impl OpenAIProvider {
    /// Create a provider; empty config fields take OpenAI defaults.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let config = ProviderConfig {
            provider_type: ProviderType::OpenAI,
            ..config
        }
        .resolved();
        let transport = HttpTransport::new(&config)?;
        Ok(Self { config, transport })
    }

    /// Override the transport's first backoff delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.transport = self.transport.with_backoff_base(base);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::ProviderNotConfigured)
        }
    }
}

/// Chat-capable model ids, by name prefix.
pub(crate) fn is_chat_model(id: &str) -> bool {
    defaults::OPENAI_CHAT_MODEL_PREFIXES
        .iter()
        .any(|prefix| id.starts_with(prefix))
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        self.ensure_configured()?;

        let auth = self.bearer();
        let body = self
            .transport
            .get(&self.url("/models"), &[("Authorization", &auth)])
            .await?;
        let list: types::ModelList = decode(&body)?;

        Ok(list
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| is_chat_model(id))
            .collect())
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "openai", op = "complete", model = %req.model_or(&self.config.default_model)))]
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.ensure_configured()?;

        let request = ChatCompletionRequest {
            model: req.model_or(&self.config.default_model),
            messages: req
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: req.positive_max_tokens(),
            temperature: req.positive_temperature(),
            top_p: req.positive_top_p(),
            stream: false,
        };

        let auth = self.bearer();
        let body = self
            .transport
            .post_json(&self.url("/chat/completions"), &request, &[("Authorization", &auth)])
            .await?;
        let response: types::ChatCompletionResponse = decode(&body)?;

        let choice = response.choices.into_iter().next().ok_or_else(|| Error::Api {
            status: 200,
            message: "no completion choices returned".to_string(),
        })?;
        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        debug!(
            response_len = choice.message.content.len(),
            total_tokens = usage.total_tokens,
            "Completion received"
        );
        Ok(CompletionResponse {
            content: choice.message.content,
            model: if response.model.is_empty() {
                request.model.to_string()
            } else {
                response.model
            },
            usage,
            finish_reason: choice.finish_reason.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "openai", op = "embed", input_count = req.input.len()))]
    async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.ensure_configured()?;

        let model = req.model_or(&self.config.embedding_model);
        if req.input.is_empty() {
            return Ok(EmbeddingResponse {
                model: model.to_string(),
                ..Default::default()
            });
        }

        let request = types::EmbeddingRequest {
            model,
            input: &req.input,
            dimensions: req.dimensions.filter(|d| *d > 0),
        };

        let auth = self.bearer();
        let body = self
            .transport
            .post_json(&self.url("/embeddings"), &request, &[("Authorization", &auth)])
            .await?;
        let response: types::EmbeddingResponse = decode(&body)?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: 0,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(EmbeddingResponse {
            embeddings: data.into_iter().map(|d| d.embedding).collect(),
            model: if response.model.is_empty() {
                model.to_string()
            } else {
                response.model
            },
            usage,
        })
    }

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        tasks::default_suggest_tags(self, req).await
    }

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        tasks::default_summarize(self, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_model_filter() {
        assert!(is_chat_model("gpt-4o-mini"));
        assert!(is_chat_model("gpt-3.5-turbo"));
        assert!(is_chat_model("o1-preview"));
        assert!(is_chat_model("chatgpt-4o-latest"));
        assert!(!is_chat_model("text-embedding-3-small"));
        assert!(!is_chat_model("whisper-1"));
        assert!(!is_chat_model("dall-e-3"));
    }

    #[test]
    fn test_defaults_applied() {
        let provider = OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI)).unwrap();
        assert_eq!(provider.default_model(), "gpt-4o-mini");
        assert_eq!(provider.config().embedding_model, "text-embedding-3-small");
        assert_eq!(provider.url("/models"), "https://api.openai.com/v1/models");
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let provider = OpenAIProvider::new(
            ProviderConfig::new(ProviderType::OpenAI).with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(
            provider.url("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_configured_with_key() {
        let provider = OpenAIProvider::new(
            ProviderConfig::new(ProviderType::OpenAI).with_api_key("sk-test"),
        )
        .unwrap();
        assert!(provider.is_configured());
        assert_eq!(provider.name(), "OpenAI");
        assert_eq!(provider.provider_type(), ProviderType::OpenAI);
    }

    #[tokio::test]
    async fn test_unconfigured_requests_fail() {
        let provider = OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI)).unwrap();
        let err = provider
            .complete(&CompletionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
        let err = provider
            .embed(&EmbeddingRequest::new(vec!["x".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
        let err = provider.available_models().await.unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
    }
}
