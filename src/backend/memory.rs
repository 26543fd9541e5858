//! In-Process Backend Module
//!
//! HashMap storage with TTL expiration checked at read time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{filter_keys, BackendStats, CacheBackend, CacheEntry};
use crate::error::Result;
use crate::key::glob::glob_to_regex;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    stats: BackendStats,
}

impl Inner {
    /// Drops every expired entry, returning how many went.
    fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.stats.record_expirations(removed);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }
}

// == In-Memory Backend ==
/// In-process backend.
///
/// Each `new()` creates an independent namespace; clones share it. Expired
/// entries stay resident until a read or an enumeration touches them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryBackend {
    // == Constructor ==
    /// Creates an empty backend with its own namespace.
    pub fn new() -> Self {
        Self::default()
    }

    // == Stats ==
    /// Returns current statistics.
    pub async fn stats(&self) -> BackendStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Length ==
    /// Number of resident entries, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    // == Entry ==
    /// Returns a copy of the resident entry under `key` without expiry checks.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner.read().await.entries.get(key).cloned()
    }

    /// Reads a live value, evicting the entry if it has expired.
    async fn live_value(&self, key: &str, record: bool) -> Option<String> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        match inner.entries.get(key).map(|entry| entry.is_expired()) {
            None => {
                if record {
                    inner.stats.record_miss();
                }
                None
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.stats.record_expirations(1);
                inner.stats.set_total_entries(inner.entries.len());
                if record {
                    inner.stats.record_miss();
                }
                debug!("Evicted expired entry on read: {}", key);
                None
            }
            Some(false) => {
                if record {
                    inner.stats.record_hit();
                }
                inner.entries.get(key).map(|entry| entry.value.clone())
            }
        }
    }

    /// Live keys, after dropping anything expired.
    async fn live_keys(&self) -> Vec<String> {
        let mut inner = self.inner.write().await;
        inner.purge_expired();
        inner.entries.keys().cloned().collect()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_value(key, true).await)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key, false).await.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.entries.remove(key);
        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.stats.set_total_entries(0);
        Ok(())
    }

    async fn keys(&self, glob: Option<&str>) -> Result<Vec<String>> {
        let keys = self.live_keys().await;
        match glob {
            None => Ok(keys),
            Some(glob) => {
                let re = glob_to_regex(glob)?;
                Ok(keys.into_iter().filter(|k| re.is_match(k)).collect())
            }
        }
    }

    async fn keys_by_prefix(&self, prefix: &str, pattern: Option<&Regex>) -> Result<Vec<String>> {
        let keys = self
            .live_keys()
            .await
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        Ok(filter_keys(keys, pattern))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = InMemoryBackend::new();

        backend.set("k1", "\"v1\"", None).await.unwrap();
        assert_eq!(backend.get("k1").await.unwrap(), Some("\"v1\"".to_string()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() {
        let backend = InMemoryBackend::new();

        backend
            .set("k", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        backend.set("k", "2", None).await.unwrap();
        sleep(Duration::from_millis(80)).await;

        assert_eq!(backend.get("k").await.unwrap(), Some("2".to_string()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_lingers_until_read() {
        let backend = InMemoryBackend::new();
        backend
            .set("k", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        sleep(Duration::from_millis(80)).await;

        // still resident
        assert_eq!(backend.len().await, 1);
        assert!(backend.entry("k").await.unwrap().is_expired());

        assert_eq!(backend.get("k").await.unwrap(), None);
        assert_eq!(backend.len().await, 0);

        let stats = backend.stats().await;
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_exists_respects_expiry() {
        let backend = InMemoryBackend::new();
        backend
            .set("k", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(backend.exists("k").await.unwrap());

        sleep(Duration::from_millis(80)).await;
        assert!(!backend.exists("k").await.unwrap());
        assert!(!backend.exists("never").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let backend = InMemoryBackend::new();
        backend.set("k", "1", None).await.unwrap();

        backend.delete("k").await.unwrap();
        backend.delete("k").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = InMemoryBackend::new();
        backend.set("a", "1", None).await.unwrap();
        backend.set("b", "2", None).await.unwrap();

        backend.clear().await.unwrap();
        assert!(backend.is_empty().await);
        assert!(backend.keys(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_with_glob() {
        let backend = InMemoryBackend::new();
        backend.set("get_user:(1):{}", "1", None).await.unwrap();
        backend.set("get_user:(2):{}", "2", None).await.unwrap();
        backend.set("list_users:():{}", "3", None).await.unwrap();

        let mut all = backend.keys(None).await.unwrap();
        all.sort();
        assert_eq!(all.len(), 3);

        let mut users = backend.keys(Some("get_user:*")).await.unwrap();
        users.sort();
        assert_eq!(users, vec!["get_user:(1):{}", "get_user:(2):{}"]);
    }

    #[tokio::test]
    async fn test_keys_with_reversed_class_range() {
        let backend = InMemoryBackend::new();
        backend.set("user:m", "1", None).await.unwrap();
        backend.set("user:5", "2", None).await.unwrap();

        let keys = backend.keys(Some("user:[z-a]")).await.unwrap();
        assert_eq!(keys, vec!["user:m"]);
    }

    #[tokio::test]
    async fn test_enumeration_skips_expired() {
        let backend = InMemoryBackend::new();
        backend
            .set("short", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        backend.set("long", "2", None).await.unwrap();
        sleep(Duration::from_millis(80)).await;

        assert_eq!(backend.keys(None).await.unwrap(), vec!["long"]);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_keys_by_prefix_with_regex() {
        let backend = InMemoryBackend::new();
        backend.set("get_user:(1):{}", "1", None).await.unwrap();
        backend.set("get_users:():{}", "2", None).await.unwrap();
        backend.set("other:():{}", "3", None).await.unwrap();

        let mut prefixed = backend.keys_by_prefix("get_user", None).await.unwrap();
        prefixed.sort();
        assert_eq!(prefixed, vec!["get_user:(1):{}", "get_users:():{}"]);

        let re = Regex::new(r"^get_user:").unwrap();
        let filtered = backend.keys_by_prefix("get_user", Some(&re)).await.unwrap();
        assert_eq!(filtered, vec!["get_user:(1):{}"]);
    }

    #[tokio::test]
    async fn test_instances_are_isolated_clones_share() {
        let a = InMemoryBackend::new();
        let b = InMemoryBackend::new();
        let a2 = a.clone();

        a.set("k", "1", None).await.unwrap();
        assert_eq!(b.get("k").await.unwrap(), None);
        assert_eq!(a2.get("k").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_stats_hits_and_misses() {
        let backend = InMemoryBackend::new();
        backend.set("k", "1", None).await.unwrap();
        backend.get("k").await.unwrap();
        backend.get("nope").await.unwrap();

        let stats = backend.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
