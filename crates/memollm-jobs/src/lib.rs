//! # memollm-jobs
//!
//! Tag suggestion service for memollm.
//!
//! This crate provides:
//! - A TTL and capacity bounded cache of tag suggestions
//! - Fixed-window per-user rate limiting
//! - Asynchronous tag jobs processed by a worker pool over a bounded queue
//! - Completion notifications via a notifier trait and a broadcast channel
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use memollm_inference::LlmService;
//! use memollm_jobs::{TagService, TagServiceConfig};
//!
//! let llm = Arc::new(LlmService::new());
//! let tags = TagService::new(llm, TagServiceConfig::from_env());
//!
//! let job = tags.suggest_tags_async(1, 42, "Sprint retro notes", &[]).await?;
//! let mut events = tags.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! tags.stop().await;
//! ```

pub mod cache;
pub mod job;
pub mod rate_limit;
pub mod service;

pub use cache::{cache_key, CacheStats, TagCache};
pub use job::{TagJob, TagJobStatus};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use service::{TagJobEvent, TagJobNotifier, TagService, TagServiceConfig};
