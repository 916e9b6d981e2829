//! Fixed-window per-user rate limiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use memollm_core::{Error, Result};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    ends_at: Instant,
}

/// Quota view for one user; reading it consumes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<i32, Window>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    /// Consume one slot for `user_id`, or fail with `QuotaExceeded`.
    ///
    /// A window that has fully elapsed is replaced by a fresh one.
    pub fn check_and_increment(&self, user_id: i32) -> Result<()> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| Error::Internal("rate limiter lock poisoned".to_string()))?;
        let now = Instant::now();

        match windows.get_mut(&user_id) {
            Some(window) if now <= window.ends_at => {
                if window.count >= self.limit {
                    return Err(Error::QuotaExceeded);
                }
                window.count += 1;
            }
            _ => {
                windows.insert(
                    user_id,
                    Window {
                        count: 1,
                        ends_at: now + self.window,
                    },
                );
            }
        }
        Ok(())
    }

    /// Drop windows that have fully elapsed and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut windows) = self.windows.lock() else {
            return 0;
        };
        let now = Instant::now();
        let before = windows.len();
        windows.retain(|_, w| now <= w.ends_at);
        before - windows.len()
    }

    /// Number of users with a tracked window, expired or not.
    pub fn tracked_users(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn status(&self, user_id: i32) -> RateLimitStatus {
        let now = Instant::now();
        let current = self
            .windows
            .lock()
            .ok()
            .and_then(|w| w.get(&user_id).copied())
            .filter(|w| now <= w.ends_at);

        let (remaining, until_reset) = match current {
            Some(window) => (
                self.limit.saturating_sub(window.count),
                window.ends_at.saturating_duration_since(now),
            ),
            None => (self.limit, self.window),
        };

        RateLimitStatus {
            remaining,
            limit: self.limit,
            reset_at: Utc::now()
                + chrono::Duration::from_std(until_reset).unwrap_or_else(|_| chrono::Duration::zero()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limit_enforced_per_user() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.check_and_increment(1).unwrap();
        }
        assert!(matches!(
            limiter.check_and_increment(1),
            Err(Error::QuotaExceeded)
        ));
        limiter.check_and_increment(2).unwrap();
        assert_eq!(limiter.status(2).remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_elapsed() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check_and_increment(7).unwrap();
        assert!(limiter.check_and_increment(7).is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.check_and_increment(7).unwrap();
        assert_eq!(limiter.status(7).remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_does_not_consume() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let fresh = limiter.status(5);
        assert_eq!(fresh.remaining, 2);
        assert_eq!(fresh.limit, 2);
        assert!(fresh.reset_at > Utc::now());

        limiter.status(5);
        limiter.check_and_increment(5).unwrap();
        assert_eq!(limiter.status(5).remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_call_does_not_extend_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check_and_increment(9).unwrap();
        for _ in 0..5 {
            assert!(limiter.check_and_increment(9).is_err());
        }
        assert_eq!(limiter.status(9).remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_only_elapsed_windows() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        for user in 0..100 {
            limiter.check_and_increment(user).unwrap();
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check_and_increment(500).unwrap();
        assert_eq!(limiter.purge_expired(), 0);
        assert_eq!(limiter.tracked_users(), 101);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(limiter.purge_expired(), 100);
        assert_eq!(limiter.tracked_users(), 1);
        assert_eq!(limiter.status(500).remaining, 1);
        assert_eq!(limiter.status(0).remaining, 2);
    }
}
