//! Structured logging schema and field name constants for memollm.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Background work failed with no caller to report to |
//! | WARN  | Retried attempt, slow call, or automatic fallback applied |
//! | INFO  | Lifecycle events (provider registered, key stored, workers stopped) |
//! | DEBUG | Per-request detail, cache hits, decision points |
//!
//! API keys are never logged in plaintext; use the masked form.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "inference", "vault", "tags"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "openai", "anthropic", "transport", "registry", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "complete", "embed", "suggest_tags", "store_key"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Provider type tag ("openai", "ollama", ...).
pub const PROVIDER: &str = "provider";

/// Model name used for the request.
pub const MODEL: &str = "model";

/// Owning user id (0 = instance-level).
pub const USER_ID: &str = "user_id";

/// Tag job id.
pub const JOB_ID: &str = "job_id";

/// Memo the tag job belongs to.
pub const MEMO_ID: &str = "memo_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Transport attempt number (0 = first try).
pub const ATTEMPT: &str = "attempt";

/// HTTP status code of a backend response.
pub const STATUS: &str = "status";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Number of tags returned.
pub const TAG_COUNT: &str = "tag_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
