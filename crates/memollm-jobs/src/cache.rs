//! TTL + capacity bounded cache of tag suggestions.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

/// Cache key over the content and the existing tags, in order.
///
/// Each part is length-prefixed so shifting bytes between content and tags
/// changes the key. The same tags in a different order produce a different key.
pub fn cache_key(content: &str, existing_tags: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in std::iter::once(content).chain(existing_tags.iter().map(String::as_str)) {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let mut key = hex::encode(hasher.finalize());
    key.truncate(32);
    key
}

#[derive(Debug, Clone)]
struct CachedTags {
    tags: Vec<String>,
    created_at: Instant,
}

/// Cache occupancy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

pub struct TagCache {
    entries: RwLock<HashMap<String, CachedTags>>,
    ttl: Duration,
    max_size: usize,
}

impl TagCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_size: max_size.max(1),
        }
    }

    /// Copy of the cached tags, or `None` on miss or expiry.
    pub fn get(&self, content: &str, existing_tags: &[String]) -> Option<Vec<String>> {
        let key = cache_key(content, existing_tags);
        let entries = self.entries.read().ok()?;
        let cached = entries.get(&key)?;
        if cached.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(cached.tags.clone())
    }

    pub fn insert(&self, content: &str, existing_tags: &[String], tags: Vec<String>) {
        let key = cache_key(content, existing_tags);
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            self.evict(&mut entries);
        }
        entries.insert(
            key,
            CachedTags {
                tags,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries, then the oldest tenth (at least one) if still full.
    fn evict(&self, entries: &mut HashMap<String, CachedTags>) {
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, cached| cached.created_at.elapsed() <= ttl);

        if entries.len() >= self.max_size {
            let to_remove = (self.max_size / 10).max(1);
            let mut by_age: Vec<(Instant, String)> = entries
                .iter()
                .map(|(key, cached)| (cached.created_at, key.clone()))
                .collect();
            by_age.sort();
            for (_, key) in by_age.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }

        debug!(
            subsystem = "tags",
            component = "cache",
            evicted = before - entries.len(),
            remaining = entries.len(),
            "Evicted tag cache entries"
        );
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().map(|e| e.len()).unwrap_or(0),
            max_size: self.max_size,
        }
    }
}
