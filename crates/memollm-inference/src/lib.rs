//! # memollm-inference
//!
//! LLM provider backends for memollm.
//!
//! This crate provides:
//! - A shared HTTP transport with retry, exponential backoff and error mapping
//! - OpenAI, Anthropic, Gemini and Ollama implementations of [`LlmProvider`]
//! - Completion-based tag suggestion and summarization with a heuristic
//!   fallback parser for malformed model output
//! - [`LlmService`], an explicitly owned registry with one active provider
//! - [`LlmSettings`] (TOML) and [`ConfigManager`] for loading and saving
//!   provider configuration with priority-ordered fallback
//!
//! # Feature Flags
//!
//! - `mock`: expose [`mock::MockProvider`] to dependent crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memollm_inference::{ConfigManager, LlmService, LlmSettings};
//! use memollm_core::SuggestTagsRequest;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = Arc::new(LlmService::new());
//!     let manager = ConfigManager::new(service.clone());
//!     let settings = LlmSettings::load(None).unwrap();
//!     manager.load_settings(&settings).unwrap();
//!
//!     let tags = service
//!         .suggest_tags(&SuggestTagsRequest::new("Quarterly planning notes"))
//!         .await
//!         .unwrap();
//!     println!("{:?}", tags.tags);
//! }
//! ```

pub mod anthropic;
pub mod config_manager;
pub mod factory;
pub mod gemini;
pub mod http_error;
pub mod ollama;
pub mod openai;
pub mod service;
pub mod settings;
pub mod tag_parse;
pub mod tasks;
pub mod transport;

// Mock provider for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use memollm_core::LlmProvider;

pub use anthropic::AnthropicProvider;
pub use config_manager::{ConfigManager, FALLBACK_ORDER};
pub use factory::create_provider;
pub use gemini::GeminiProvider;
pub use http_error::{error_from_response, HttpErrorCode};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use service::LlmService;
pub use settings::{CloudProviderSettings, LlmSettings, OllamaSettings, SettingsError};
pub use transport::HttpTransport;
