//! Tag suggestion job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a tag job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TagJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagJobStatus::Pending => "pending",
            TagJobStatus::Running => "running",
            TagJobStatus::Completed => "completed",
            TagJobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TagJobStatus::Completed | TagJobStatus::Failed)
    }
}

impl std::fmt::Display for TagJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous tag suggestion request for one memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagJob {
    pub id: String,
    pub memo_id: i32,
    pub content: String,
    pub existing_tags: Vec<String>,
    pub user_id: i32,
    pub status: TagJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TagJob {
    /// New pending job with a time-ordered id.
    pub fn pending(user_id: i32, memo_id: i32, content: &str, existing_tags: &[String]) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            memo_id,
            content: content.to_string(),
            existing_tags: existing_tags.to_vec(),
            user_id,
            status: TagJobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Job that finished at creation time, used for cache hits.
    pub fn completed_from_cache(
        user_id: i32,
        memo_id: i32,
        content: &str,
        existing_tags: &[String],
        tags: Vec<String>,
    ) -> Self {
        let mut job = Self::pending(user_id, memo_id, content, existing_tags);
        job.status = TagJobStatus::Completed;
        job.result = Some(tags);
        job.completed_at = Some(job.created_at);
        job
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_job_defaults() {
        let job = TagJob::pending(3, 42, "content", &["a".to_string()]);
        assert_eq!(job.status, TagJobStatus::Pending);
        assert_eq!(job.memo_id, 42);
        assert_eq!(job.user_id, 3);
        assert_eq!(job.existing_tags, vec!["a".to_string()]);
        assert!(job.result.is_none());
        assert!(job.completed_at.is_none());
        assert!(Uuid::parse_str(&job.id).is_ok());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_cached_job_is_already_completed() {
        let job = TagJob::completed_from_cache(1, 2, "c", &[], vec!["x".to_string()]);
        assert_eq!(job.status, TagJobStatus::Completed);
        assert_eq!(job.result, Some(vec!["x".to_string()]));
        assert_eq!(job.completed_at, Some(job.created_at));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TagJobStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(TagJobStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = TagJob::pending(1, 1, "c", &[]);
        let b = TagJob::pending(1, 1, "c", &[]);
        assert_ne!(a.id, b.id);
    }
}
