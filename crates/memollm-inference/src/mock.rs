//! Mock provider for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use memollm_inference::mock::MockProvider;
//!
//! let provider = MockProvider::new()
//!     .with_tags(["meeting", "project"])
//!     .with_latency_ms(5);
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use memollm_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderConfig, ProviderType, Result, SuggestTagsRequest, SuggestTagsResponse,
    SummarizeRequest, SummarizeResponse, TokenUsage,
};

use crate::tasks;

type FailureFn = Arc<dyn Fn() -> Error + Send + Sync>;

/// In-process provider with scripted replies and a call log.
#[derive(Clone)]
pub struct MockProvider {
    config: ProviderConfig,
    completion: String,
    tags: Option<Vec<String>>,
    failure: Option<FailureFn>,
    latency_ms: u64,
    dimension: usize,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: &'static str,
    pub completion: Option<CompletionRequest>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Configured OpenAI-typed mock.
    pub fn new() -> Self {
        Self::of_type(ProviderType::OpenAI)
    }

    /// Configured mock reporting the given provider type.
    pub fn of_type(provider_type: ProviderType) -> Self {
        let mut config = ProviderConfig::with_defaults(provider_type);
        if !provider_type.is_local() {
            config.api_key = "sk-mock-key-0000000000".to_string();
        }
        Self {
            config,
            completion: "Mock response".to_string(),
            tags: None,
            failure: None,
            latency_ms: 0,
            dimension: 8,
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Clear the credential (or host) so the provider reports unconfigured.
    pub fn unconfigured(mut self) -> Self {
        self.config.api_key.clear();
        self.config.host.clear();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    /// Content returned by `complete`.
    pub fn with_completion(mut self, content: impl Into<String>) -> Self {
        self.completion = content.into();
        self
    }

    /// Tags returned by `suggest_tags` without going through `complete`.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Every request method fails with the error built by `make`.
    pub fn with_failure<F>(mut self, make: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        self.failure = Some(Arc::new(make));
        self
    }

    /// Simulated latency for all request methods.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Completion requests received, in order.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.completion.clone())
            .collect()
    }

    /// Number of calls to the named operation.
    pub fn call_count(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    async fn enter(&self, operation: &'static str, completion: Option<&CompletionRequest>) -> Result<()> {
        self.call_log.lock().unwrap().push(MockCall {
            operation,
            completion: completion.cloned(),
        });
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        if !self.is_configured() {
            return Err(Error::ProviderNotConfigured);
        }
        match &self.failure {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        Ok(vec![self.config.default_model.clone()])
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.enter("complete", Some(req)).await?;
        Ok(CompletionResponse {
            content: self.completion.clone(),
            model: req.model_or(&self.config.default_model).to_string(),
            usage: TokenUsage::new(10, 5),
            finish_reason: "stop".to_string(),
        })
    }

    async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.enter("embed", None).await?;
        let embeddings = req
            .input
            .iter()
            .map(|text| {
                let seed = text.len() as f32;
                (0..self.dimension).map(|i| (seed + i as f32) / 100.0).collect()
            })
            .collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: req.model_or(&self.config.embedding_model).to_string(),
            usage: TokenUsage::new(req.input.len() as u32, 0),
        })
    }

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        match &self.tags {
            Some(tags) => {
                self.enter("suggest_tags", None).await?;
                Ok(SuggestTagsResponse {
                    tags: tags.clone(),
                    confidence: None,
                })
            }
            None => {
                self.call_log.lock().unwrap().push(MockCall {
                    operation: "suggest_tags",
                    completion: None,
                });
                tasks::default_suggest_tags(self, req).await
            }
        }
    }

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        self.call_log.lock().unwrap().push(MockCall {
            operation: "summarize",
            completion: None,
        });
        tasks::default_summarize(self, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memollm_core::Message;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockProvider::new().with_completion("hi");
        let req = CompletionRequest::new(vec![Message::user("hello")]);
        let resp = mock.complete(&req).await.unwrap();
        assert_eq!(resp.content, "hi");
        assert_eq!(mock.call_count("complete"), 1);
        assert_eq!(mock.calls()[0], req);
    }

    #[tokio::test]
    async fn test_mock_unconfigured_fails() {
        let mock = MockProvider::new().unconfigured();
        assert!(!mock.is_configured());
        let err = mock
            .complete(&CompletionRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
    }

    #[tokio::test]
    async fn test_mock_fixed_tags_skip_completion() {
        let mock = MockProvider::new().with_tags(["a", "b"]);
        let resp = mock
            .suggest_tags(&SuggestTagsRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(resp.tags, vec!["a", "b"]);
        assert_eq!(mock.call_count("complete"), 0);
        assert_eq!(mock.call_count("suggest_tags"), 1);
    }

    #[tokio::test]
    async fn test_mock_embeddings_align_with_input() {
        let mock = MockProvider::of_type(ProviderType::Ollama);
        let resp = mock
            .embed(&EmbeddingRequest::new(vec!["a".into(), "bb".into()]))
            .await
            .unwrap();
        assert_eq!(resp.embeddings.len(), 2);
        assert_ne!(resp.embeddings[0], resp.embeddings[1]);
    }
}
