//! Google Gemini (Generative Language API) provider.
//!
//! Authentication is the `x-goog-api-key` header. Chat history uses the roles
//! `user` and `model`; system messages travel separately as
//! `systemInstruction`.

use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderConfig, ProviderType, Result, Role, SuggestTagsRequest,
    SuggestTagsResponse, SummarizeRequest, SummarizeResponse, TokenUsage,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::tasks;
use crate::transport::{decode, HttpTransport};

const API_KEY_HEADER: &str = "x-goog-api-key";
const GENERATE_CONTENT: &str = "generateContent";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct GeminiProvider {
    config: ProviderConfig,
    transport: HttpTransport,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let config = ProviderConfig {
            provider_type: ProviderType::Gemini,
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

    fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::ProviderNotConfigured)
        }
    }

    fn build_request<'a>(&self, req: &'a CompletionRequest) -> GenerateRequest<'a> {
        let mut system_parts = Vec::new();
        let mut contents = Vec::with_capacity(req.messages.len());
        for message in &req.messages {
            let part = Part {
                text: &message.content,
            };
            match message.role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(Content {
                    role: Some("user"),
                    parts: vec![part],
                }),
                Role::Assistant => contents.push(Content {
                    role: Some("model"),
                    parts: vec![part],
                }),
            }
        }

        let generation_config = GenerationConfig {
            temperature: req.positive_temperature(),
            top_p: req.positive_top_p(),
            max_output_tokens: req.positive_max_tokens(),
        };
        let has_config = generation_config.temperature.is_some()
            || generation_config.top_p.is_some()
            || generation_config.max_output_tokens.is_some();

        GenerateRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(Content {
                role: None,
                parts: system_parts,
            }),
            generation_config: has_config.then_some(generation_config),
        }
    }
}

/// Strip the `models/` resource prefix from a model name.
fn short_model_name(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        self.ensure_configured()?;
        let body = self
            .transport
            .get(&self.url("/models"), &[(API_KEY_HEADER, &self.config.api_key)])
            .await?;
        let list: ModelList = decode(&body)?;

        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT)
            })
            .map(|m| short_model_name(&m.name).to_string())
            .collect())
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "gemini", op = "complete", model = %req.model_or(&self.config.default_model)))]
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.ensure_configured()?;

        let model = short_model_name(req.model_or(&self.config.default_model));
        let request = self.build_request(req);
        let url = self.url(&format!("/models/{}:{}", model, GENERATE_CONTENT));
        let body = self
            .transport
            .post_json(&url, &request, &[(API_KEY_HEADER, &self.config.api_key)])
            .await?;
        let response: GenerateResponse = decode(&body)?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| Error::Api {
            status: 200,
            message: "no candidates returned".to_string(),
        })?;
        let content: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        let usage = response.usage_metadata.unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: response
                .model_version
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| model.to_string()),
            usage: TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count),
            finish_reason: candidate.finish_reason.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, req), fields(subsystem = "inference", component = "gemini", op = "embed", input_count = req.input.len()))]
    async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.ensure_configured()?;

        let model = short_model_name(req.model_or(&self.config.embedding_model));
        if req.input.is_empty() {
            return Ok(EmbeddingResponse {
                model: model.to_string(),
                ..Default::default()
            });
        }

        let request = BatchEmbedRequest {
            requests: req
                .input
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", model),
                    content: Content {
                        role: None,
                        parts: vec![Part { text }],
                    },
                    output_dimensionality: req.dimensions.filter(|d| *d > 0),
                })
                .collect(),
        };

        let url = self.url(&format!("/models/{}:batchEmbedContents", model));
        let body = self
            .transport
            .post_json(&url, &request, &[(API_KEY_HEADER, &self.config.api_key)])
            .await?;
        let response: BatchEmbedResponse = decode(&body)?;

        if response.embeddings.len() != req.input.len() {
            return Err(Error::Api {
                status: 200,
                message: format!(
                    "expected {} embeddings, got {}",
                    req.input.len(),
                    response.embeddings.len()
                ),
            });
        }

        Ok(EmbeddingResponse {
            embeddings: response.embeddings.into_iter().map(|e| e.values).collect(),
            model: model.to_string(),
            usage: TokenUsage::default(),
        })
    }

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        tasks::default_suggest_tags(self, req).await
    }

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        tasks::default_summarize(self, req).await
    }
}
