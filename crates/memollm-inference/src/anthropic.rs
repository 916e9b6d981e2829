//! Anthropic Messages API provider.
//!
//! The Messages API requires `max_tokens` on every call and takes the system
//! prompt as a top-level `system` field rather than as a message. There is no
//! embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{
    defaults, CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderConfig, ProviderType, Result, Role, SuggestTagsRequest,
    SuggestTagsResponse, SummarizeRequest, SummarizeResponse, TokenUsage,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::tasks;
use crate::transport::{decode, HttpTransport};

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct AnthropicProvider {
    config: ProviderConfig,
    transport: HttpTransport,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let config = ProviderConfig {
            provider_type: ProviderType::Anthropic,
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

    fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::ProviderNotConfigured)
        }
    }

    fn build_request<'a>(&'a self, req: &'a CompletionRequest) -> MessagesRequest<'a> {
        let mut system = None;
        let mut messages = Vec::with_capacity(req.messages.len());
        for message in &req.messages {
            match message.role {
                // Last system message wins.
                Role::System => system = Some(message.content.as_str()),
                role => messages.push(WireMessage {
                    role: role.as_str(),
                    content: &message.content,
                }),
            }
        }

        MessagesRequest {
            model: req.model_or(&self.config.default_model),
            messages,
            max_tokens: req
                .positive_max_tokens()
                .unwrap_or(defaults::ANTHROPIC_MAX_TOKENS),
            system: system.filter(|s| !s.is_empty()),
            temperature: req.positive_temperature(),
            top_p: req.positive_top_p(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        self.ensure_configured()?;
        Ok(defaults::ANTHROPIC_MODELS
            .iter()
            .map(|m| m.to_string())
            .collect())
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "anthropic", op = "complete", model = %req.model_or(&self.config.default_model)))]
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.ensure_configured()?;

        let request = self.build_request(req);
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let body = self
            .transport
            .post_json(
                &url,
                &request,
                &[
                    ("x-api-key", &self.config.api_key),
                    ("anthropic-version", defaults::ANTHROPIC_API_VERSION),
                ],
            )
            .await?;
        let response: MessagesResponse = decode(&body)?;

        let content: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect();

        Ok(CompletionResponse {
            content,
            model: response.model,
            usage: TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
            finish_reason: response.stop_reason.unwrap_or_default(),
        })
    }

    async fn embed(&self, _req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.ensure_configured()?;
        Err(Error::Unsupported {
            provider: ProviderType::Anthropic,
            capability: "embeddings",
        })
    }

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        tasks::default_suggest_tags(self, req).await
    }

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        tasks::default_summarize(self, req).await
    }
}
