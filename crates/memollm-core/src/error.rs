//! Error types for memollm.

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderType;

/// Result type alias using memollm's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for provider, registry, and tag service operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No credential/host set, or no active provider selected
    #[error("LLM provider not configured")]
    ProviderNotConfigured,

    /// Remote backend rejected the credential (HTTP 401)
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Remote backend throttled the request (HTTP 429)
    #[error("Provider rate limit exceeded")]
    RateLimited,

    /// Local per-user quota for tag suggestions exhausted
    #[error("Rate limit exceeded for tag suggestions")]
    QuotaExceeded,

    /// Backend unreachable (HTTP 502/503/504 or connection failure)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Prompt exceeds the model's context window
    #[error("Context too long: {0}")]
    ContextTooLong(String),

    /// Requested model does not exist on the backend
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider does not implement the requested capability
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: ProviderType,
        capability: &'static str,
    },

    /// Any other non-2xx response from the backend
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider type was never registered with the service
    #[error("Provider {0} not registered")]
    ProviderNotRegistered(ProviderType),

    /// No registered provider is configured
    #[error("No configured provider available for fallback")]
    NoFallbackProvider,

    /// Feature switched off by configuration
    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    /// Bounded job queue has no free slot
    #[error("Job queue is full")]
    QueueFull,

    /// Service was stopped and no longer accepts work
    #[error("Service stopped")]
    ServiceStopped,

    /// Operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the shared transport should attempt the request again.
    ///
    /// Network failures reach this as `ProviderUnavailable`; a `Request`
    /// error means the request itself could not be built.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited | Error::ProviderUnavailable(_) => true,
            Error::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True for both backend throttling and the local tag quota.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited | Error::QuotaExceeded)
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, Error::ProviderNotConfigured | Error::NoFallbackProvider)
    }

    pub fn is_feature_disabled(&self) -> bool {
        matches!(self, Error::FeatureDisabled(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Error::Request(e.to_string())
        } else {
            Error::ProviderUnavailable(e.to_string())
        }
    }
}
