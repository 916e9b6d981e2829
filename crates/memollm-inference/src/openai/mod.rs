//! OpenAI chat completions and embeddings provider.
//!
//! Works with the OpenAI cloud API and any endpoint exposing the same
//! `/chat/completions`, `/embeddings` and `/models` routes (set `base_url`).
//!
//! # Example
//!
//! ```rust,no_run
//! use memollm_core::{CompletionRequest, LlmProvider, Message, ProviderConfig, ProviderType};
//! use memollm_inference::openai::OpenAIProvider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ProviderConfig::new(ProviderType::OpenAI).with_api_key("sk-...");
//!     let provider = OpenAIProvider::new(config).unwrap();
//!     let req = CompletionRequest::new(vec![Message::user("Hello")]);
//!     let reply = provider.complete(&req).await.unwrap();
//!     println!("{}", reply.content);
//! }
//! ```

mod provider;
mod types;

pub use provider::OpenAIProvider;
pub use types::*;
