//! Capability contract implemented by every LLM backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;
use crate::provider::{ProviderConfig, ProviderType};

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// One LLM backend: chat completion, embeddings, tag suggestion, summaries.
///
/// Every request method fails with [`crate::Error::ProviderNotConfigured`]
/// when [`is_configured`](LlmProvider::is_configured) is false. Backends
/// without a capability return [`crate::Error::Unsupported`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Resolved configuration this instance was built from.
    fn config(&self) -> &ProviderConfig;

    fn provider_type(&self) -> ProviderType {
        self.config().provider_type
    }

    fn name(&self) -> &str {
        self.provider_type().display_name()
    }

    /// Field-presence check only; never touches the network.
    fn is_configured(&self) -> bool {
        self.config().has_credentials()
    }

    fn default_model(&self) -> &str {
        &self.config().default_model
    }

    /// Conversational models offered by the backend.
    async fn available_models(&self) -> Result<Vec<String>>;

    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse>;

    async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse>;

    async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse>;

    async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse>;
}
