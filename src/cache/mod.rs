//! Abstract TTL key-value cache used by the Rule Store and AI Oracle Client.
//!
//! The trait is intentionally backend-agnostic — an in-memory implementation
//! is provided for tests and for `storage-redis`-less deployments; a Redis
//! backend can be added behind the `storage-redis` feature without touching
//! callers, the same way the teacher gates backend swaps through Cargo
//! features for its moderation/storage backends.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A TTL-aware key-value cache.
///
/// Implementations must be `Send + Sync` — callers share a single handle
/// (usually `Arc<dyn Cache>`) across request tasks.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a raw value, if present and not expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a raw value with the given time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove a key immediately, regardless of TTL.
    async fn clear(&self, key: &str);
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// A process-local, mutex-guarded cache.
///
/// This is the default backend: simple, dependency-free, and sufficient for
/// a single gateway instance. Multi-instance deployments are expected to
/// supply a `storage-redis`-backed [`Cache`] instead, mirroring the rule
/// store's cache-then-durable-store read-through design.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn clear(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.remove(key);
    }
}

/// Well-known cache key namespaces, matching the persisted-state contract.
pub mod keys {
    /// Active pattern catalog.
    pub const PATTERNS: &str = "patterns:active";
    /// Allow-list literal set.
    pub const ALLOWLIST: &str = "allowlist:all";
    /// Deny-list literal set.
    pub const BLOCKLIST: &str = "blocklist:all";

    /// The AI confidence cache key for a given label and content hash.
    #[must_use]
    pub fn ai_confidence(label: &str, text_hash: &str) -> String {
        format!("ai_conf:{label}:{text_hash}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_millis(1))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn clear_removes_the_key() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await;
        cache.clear("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[test]
    fn ai_confidence_key_shape() {
        assert_eq!(keys::ai_confidence("SECRET", "abc123"), "ai_conf:SECRET:abc123");
    }
}
