//! Ollama (self-hosted) provider.
//!
//! Configured means "has a host"; no credential is sent. The `/api/embed`
//! route is called once per input, sequentially.

use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderConfig, ProviderType, Result, SuggestTagsRequest, SuggestTagsResponse,
    SummarizeRequest, SummarizeResponse, TokenUsage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::tasks;
use crate::transport::{decode, HttpTransport};

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    message: ResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    prompt_eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(default)]
    version: String,
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct OllamaProvider {
    config: ProviderConfig,
    transport: HttpTransport,
}

impl OllamaProvider {
    /// Create a provider; an empty host falls back to `http://localhost:11434`.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let config = ProviderConfig {
            provider_type: ProviderType::Ollama,
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
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::ProviderNotConfigured)
        }
    }

    /// Ping `/api/version`; returns the server version string.
    #[instrument(skip(self), fields(subsystem = "inference", component = "ollama", op = "check_health"))]
    pub async fn check_health(&self) -> Result<String> {
        self.ensure_configured()?;
        let body = self.transport.get(&self.url("/api/version"), &[]).await?;
        let version: VersionResponse = decode(&body)?;
        debug!(version = %version.version, "Ollama reachable");
        Ok(version.version)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        self.ensure_configured()?;
        let body = self.transport.get(&self.url("/api/tags"), &[]).await?;
        let tags: TagsResponse = decode(&body)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "ollama", op = "complete", model = %req.model_or(&self.config.default_model)))]
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.ensure_configured()?;

        let options = ChatOptions {
            temperature: req.positive_temperature(),
            top_p: req.positive_top_p(),
            num_predict: req.positive_max_tokens(),
        };
        let has_options =
            options.temperature.is_some() || options.top_p.is_some() || options.num_predict.is_some();

        let model = req.model_or(&self.config.default_model);
        let request = ChatRequest {
            model,
            messages: req
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            options: has_options.then_some(options),
        };

        let body = self
            .transport
            .post_json(&self.url("/api/chat"), &request, &[])
            .await?;
        let response: ChatResponse = decode(&body)?;

        Ok(CompletionResponse {
            content: response.message.content,
            model: if response.model.is_empty() {
                model.to_string()
            } else {
                response.model
            },
            usage: TokenUsage::new(response.prompt_eval_count, response.eval_count),
            finish_reason: response.done_reason.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "ollama", op = "embed", input_count = req.input.len()))]
    async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.ensure_configured()?;

        let model = req.model_or(&self.config.embedding_model);
        let url = self.url("/api/embed");
        let mut embeddings = Vec::with_capacity(req.input.len());
        let mut prompt_tokens = 0u32;

        for input in &req.input {
            let body = self
                .transport
                .post_json(&url, &EmbedRequest { model, input }, &[])
                .await?;
            let response: EmbedResponse = decode(&body)?;
            embeddings.push(response.embeddings.into_iter().next().unwrap_or_default());
            prompt_tokens += response.prompt_eval_count;
        }

        Ok(EmbeddingResponse {
            embeddings,
            model: model.to_string(),
            usage: TokenUsage::new(prompt_tokens, 0),
        })
    }

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        tasks::default_suggest_tags(self, req).await
    }

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        tasks::default_summarize(self, req).await
    }
}
