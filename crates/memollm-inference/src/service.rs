//! Provider registry with a single active provider.
//!
//! The registry is one `RwLock` over the provider map and the active marker.
//! Request methods clone the active provider's `Arc` under the read lock and
//! release it before any network I/O.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use memollm_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Error,
    LlmProvider, ProviderStatus, ProviderType, Result, SuggestTagsRequest, SuggestTagsResponse,
    SummarizeRequest, SummarizeResponse,
};
use tracing::{debug, info};

#[derive(Default)]
struct Registry {
    providers: HashMap<ProviderType, Arc<dyn LlmProvider>>,
    active: Option<ProviderType>,
}

/// Explicitly owned registry of LLM providers.
#[derive(Default)]
pub struct LlmService {
    registry: RwLock<Registry>,
}

impl LlmService {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>> {
        self.registry
            .read()
            .map_err(|_| Error::Internal("provider registry lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>> {
        self.registry
            .write()
            .map_err(|_| Error::Internal("provider registry lock poisoned".to_string()))
    }

    /// Add or replace the provider for its type.
    ///
    /// A configured provider registered while nothing is active becomes
    /// active, including one that replaces an unconfigured instance of the
    /// same type. An existing active marker is never moved.
    pub fn register_provider(&self, provider: Arc<dyn LlmProvider>) -> Result<()> {
        let provider_type = provider.provider_type();
        let configured = provider.is_configured();

        let mut registry = self.write()?;
        let replaced = registry.providers.insert(provider_type, provider).is_some();
        let auto_activated = registry.active.is_none() && configured;
        if auto_activated {
            registry.active = Some(provider_type);
        }
        drop(registry);

        info!(
            subsystem = "inference",
            component = "service",
            provider = %provider_type,
            configured,
            replaced,
            auto_activated,
            "Registered LLM provider"
        );
        Ok(())
    }

    /// Make a registered provider the active one.
    pub fn set_active_provider(&self, provider_type: ProviderType) -> Result<()> {
        let mut registry = self.write()?;
        if !registry.providers.contains_key(&provider_type) {
            return Err(Error::ProviderNotRegistered(provider_type));
        }
        let previous = registry.active.replace(provider_type);
        drop(registry);

        if previous != Some(provider_type) {
            info!(
                subsystem = "inference",
                component = "service",
                provider = %provider_type,
                previous = ?previous,
                "Active LLM provider changed"
            );
        }
        Ok(())
    }

    /// Registered provider instance for a type.
    pub fn provider(&self, provider_type: ProviderType) -> Result<Arc<dyn LlmProvider>> {
        self.read()?
            .providers
            .get(&provider_type)
            .cloned()
            .ok_or(Error::ProviderNotRegistered(provider_type))
    }

    pub fn active_provider_type(&self) -> Option<ProviderType> {
        self.read().ok().and_then(|r| r.active)
    }

    /// Active provider, whether or not it is configured.
    pub fn active_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        let registry = self.read().ok()?;
        let active = registry.active?;
        registry.providers.get(&active).cloned()
    }

    /// Types currently registered, in type order.
    pub fn registered_types(&self) -> Vec<ProviderType> {
        let mut types: Vec<ProviderType> = self
            .read()
            .map(|r| r.providers.keys().copied().collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    /// Snapshot of every registered provider, sorted by type.
    pub fn list_providers(&self) -> Vec<ProviderStatus> {
        let Ok(registry) = self.read() else {
            return Vec::new();
        };
        let mut statuses: Vec<ProviderStatus> = registry
            .providers
            .iter()
            .map(|(ty, provider)| ProviderStatus {
                provider_type: *ty,
                name: provider.name().to_string(),
                configured: provider.is_configured(),
                active: registry.active == Some(*ty),
                default_model: provider.default_model().to_string(),
            })
            .collect();
        drop(registry);

        statuses.sort_by_key(|s| s.provider_type);
        statuses
    }

    /// True when at least one registered provider is configured.
    pub fn is_configured(&self) -> bool {
        self.read()
            .map(|r| r.providers.values().any(|p| p.is_configured()))
            .unwrap_or(false)
    }

    /// Active provider, or `ProviderNotConfigured` when none is usable.
    fn resolve(&self) -> Result<Arc<dyn LlmProvider>> {
        let provider = self.active_provider().ok_or(Error::ProviderNotConfigured)?;
        if !provider.is_configured() {
            return Err(Error::ProviderNotConfigured);
        }
        debug!(
            subsystem = "inference",
            component = "service",
            provider = %provider.provider_type(),
            "Resolved active provider"
        );
        Ok(provider)
    }

    pub async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.resolve()?.complete(req).await
    }

    pub async fn embed(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.resolve()?.embed(req).await
    }

    pub async fn suggest_tags(&self, req: &SuggestTagsRequest) -> Result<SuggestTagsResponse> {
        self.resolve()?.suggest_tags(req).await
    }

    pub async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        self.resolve()?.summarize(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use memollm_core::Message;

    #[test]
    fn test_first_configured_provider_auto_activates() {
        let service = LlmService::new();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI).unconfigured()))
            .unwrap();
        assert_eq!(service.active_provider_type(), None);

        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Anthropic)))
            .unwrap();
        assert_eq!(service.active_provider_type(), Some(ProviderType::Anthropic));

        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Ollama)))
            .unwrap();
        assert_eq!(service.active_provider_type(), Some(ProviderType::Anthropic));
    }

    #[test]
    fn test_configured_replacement_becomes_active() {
        let service = LlmService::new();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI).unconfigured()))
            .unwrap();
        assert_eq!(service.active_provider_type(), None);

        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI)))
            .unwrap();
        assert_eq!(service.active_provider_type(), Some(ProviderType::OpenAI));
        assert!(service.is_configured());
    }

    #[test]
    fn test_reregistering_keeps_existing_active() {
        let service = LlmService::new();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Ollama)))
            .unwrap();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI)))
            .unwrap();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI)))
            .unwrap();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Ollama).unconfigured()))
            .unwrap();
        assert_eq!(service.active_provider_type(), Some(ProviderType::Ollama));
    }

    #[test]
    fn test_set_active_requires_registration() {
        let service = LlmService::new();
        let err = service.set_active_provider(ProviderType::Gemini).unwrap_err();
        assert!(matches!(err, Error::ProviderNotRegistered(ProviderType::Gemini)));

        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Gemini).unconfigured()))
            .unwrap();
        service.set_active_provider(ProviderType::Gemini).unwrap();
        assert_eq!(service.active_provider_type(), Some(ProviderType::Gemini));
    }

    #[test]
    fn test_list_providers_snapshot() {
        let service = LlmService::new();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::Ollama)))
            .unwrap();
        service
            .register_provider(Arc::new(MockProvider::of_type(ProviderType::OpenAI).unconfigured()))
            .unwrap();

        let statuses = service.list_providers();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].provider_type, ProviderType::OpenAI);
        assert!(!statuses[0].configured);
        assert!(!statuses[0].active);
        assert_eq!(statuses[1].provider_type, ProviderType::Ollama);
        assert!(statuses[1].active);
        assert_eq!(statuses[1].name, "Ollama");
        assert!(service.is_configured());
    }

    #[tokio::test]
    async fn test_requests_fail_without_active_provider() {
        let service = LlmService::new();
        assert!(!service.is_configured());
        let err = service
            .complete(&CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
    }

    #[tokio::test]
    async fn test_requests_fail_when_active_is_unconfigured() {
        let service = LlmService::new();
        let mock = MockProvider::of_type(ProviderType::OpenAI).unconfigured();
        service.register_provider(Arc::new(mock.clone())).unwrap();
        service.set_active_provider(ProviderType::OpenAI).unwrap();

        let err = service
            .summarize(&SummarizeRequest::new("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotConfigured));
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_requests_delegate_to_active_provider() {
        let service = LlmService::new();
        let mock = MockProvider::new().with_completion("pong");
        service.register_provider(Arc::new(mock.clone())).unwrap();

        let resp = service
            .complete(&CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(resp.content, "pong");
        assert_eq!(mock.call_count("complete"), 1);

        let resp = service
            .embed(&EmbeddingRequest::new(vec!["a".into()]))
            .await
            .unwrap();
        assert_eq!(resp.embeddings.len(), 1);
    }
}
