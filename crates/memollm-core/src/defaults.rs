//! Centralized default constants for the memollm provider layer.
//!
//! **This module is the single source of truth** for shared default values.
//! Providers, the settings loader, and the tag service reference these
//! constants instead of defining their own magic numbers.

// =============================================================================
// TRANSPORT
// =============================================================================

/// Per-request HTTP client timeout in seconds.
pub const TIMEOUT_SECS: u64 = 30;

/// Retry ceiling for the shared transport. A configured value of 0 means this.
pub const MAX_RETRIES: u32 = 3;

/// First backoff delay; attempt `n` waits `BACKOFF_BASE_MS * 2^(n-1)`.
pub const BACKOFF_BASE_MS: u64 = 1000;

// =============================================================================
// OPENAI
// =============================================================================

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_EMBED_MODEL: &str = "text-embedding-3-small";

/// Name prefixes of conversational models kept from the `/models` catalog.
pub const OPENAI_CHAT_MODEL_PREFIXES: &[&str] = &["gpt-4", "gpt-3.5", "o1", "chatgpt"];

// =============================================================================
// ANTHROPIC
// =============================================================================

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Messages API rejects requests without `max_tokens`; used when the caller omits it.
pub const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Static catalog; the Messages API has no listing endpoint we rely on.
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

// =============================================================================
// GEMINI
// =============================================================================

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const GEMINI_EMBED_MODEL: &str = "text-embedding-004";

// =============================================================================
// OLLAMA
// =============================================================================

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "llama3.2";
pub const OLLAMA_EMBED_MODEL: &str = "nomic-embed-text";

// =============================================================================
// TAG SUGGESTION
// =============================================================================

/// Tags returned when a request leaves `max_tags` at zero.
pub const MAX_TAGS: usize = 5;

/// Tag suggestion completions run cold so the JSON array format holds.
pub const TAG_TEMPERATURE: f32 = 0.3;
pub const TAG_MAX_TOKENS: u32 = 100;

/// Longest string accepted by the heuristic tag extractor.
pub const MAX_TAG_LEN: usize = 50;

// =============================================================================
// SUMMARIZATION
// =============================================================================

pub const SUMMARY_MAX_LENGTH: usize = 200;
pub const SUMMARY_STYLE: &str = "brief";
pub const SUMMARY_TEMPERATURE: f32 = 0.5;
pub const SUMMARY_MAX_TOKENS: u32 = 300;

// =============================================================================
// TAG SERVICE
// =============================================================================

/// Cache entry lifetime in seconds (15 minutes).
pub const TAG_CACHE_TTL_SECS: u64 = 15 * 60;

pub const TAG_CACHE_SIZE: usize = 1000;

/// Requests allowed per user per window.
pub const TAG_RATE_LIMIT: u32 = 60;

pub const TAG_RATE_WINDOW_SECS: u64 = 60;

pub const TAG_WORKERS: usize = 2;

pub const TAG_QUEUE_SIZE: usize = 100;

/// Deadline for a single tag suggestion call against the registry.
pub const TAG_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Deadline for a job completion notifier.
pub const TAG_NOTIFY_TIMEOUT_SECS: u64 = 5;

/// Buffered tag job events before slow subscribers start lagging.
pub const TAG_EVENT_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_starts_at_one_second() {
        assert_eq!(BACKOFF_BASE_MS, 1000);
    }

    #[test]
    fn test_chat_prefixes_exclude_embedding_models() {
        for name in ["text-embedding-3-small", "whisper-1", "dall-e-3", "tts-1"] {
            assert!(!OPENAI_CHAT_MODEL_PREFIXES
                .iter()
                .any(|p| name.starts_with(p)));
        }
    }

    #[test]
    fn test_default_anthropic_model_is_in_catalog() {
        assert!(ANTHROPIC_MODELS.contains(&ANTHROPIC_MODEL));
    }

    #[test]
    fn test_tag_service_bounds_are_sane() {
        assert!(TAG_WORKERS > 0);
        assert!(TAG_QUEUE_SIZE >= TAG_WORKERS);
        assert!(TAG_CACHE_SIZE >= 10);
    }
}
