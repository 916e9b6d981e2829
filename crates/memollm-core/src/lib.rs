//! # memollm-core
//!
//! Core types, traits, and abstractions for the memollm provider layer.
//!
//! This crate provides the request/response model shared by every LLM
//! backend, the [`LlmProvider`] capability contract, and the error taxonomy
//! that the transport, registry, vault, and tag service all report through.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use provider::{ProviderConfig, ProviderStatus, ProviderType};
pub use traits::*;
