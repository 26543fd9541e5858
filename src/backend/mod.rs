//! Backend Module
//!
//! Storage backends behind one async capability contract: an in-process
//! map, a single networked node and a networked cluster.

mod entry;
mod memory;
mod stats;

#[cfg(feature = "redis")]
mod cluster;
#[cfg(feature = "redis")]
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::InMemoryBackend;
pub use stats::BackendStats;

#[cfg(feature = "redis")]
pub use cluster::ClusterBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

// == Cache Backend ==
/// Uniform storage contract used by the decorators.
///
/// Values are opaque encoded payloads. Implementations must be safe to share
/// across tasks; no atomicity is promised across separate calls.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stores `value` under `key`. `None` TTL means the entry never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Returns the live value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns true if a live value exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Removes `key`. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Wipes every key in this backend's namespace.
    async fn clear(&self) -> Result<()>;

    /// Lists keys matching a glob (`*`, `?`, `[...]`); `None` lists all keys.
    /// Reversed class ranges like `[z-a]` match as `[a-z]` on every backend.
    async fn keys(&self, glob: Option<&str>) -> Result<Vec<String>>;

    /// Lists keys starting with `prefix`, then keeps those `pattern` matches.
    async fn keys_by_prefix(&self, prefix: &str, pattern: Option<&Regex>) -> Result<Vec<String>>;

    /// Short backend name for log lines.
    fn name(&self) -> &'static str;
}

/// Shared handle to any backend.
pub type SharedBackend = Arc<dyn CacheBackend>;

/// Applies the optional regex filter used by `keys_by_prefix`.
pub(crate) fn filter_keys(keys: Vec<String>, pattern: Option<&Regex>) -> Vec<String> {
    match pattern {
        Some(re) => keys.into_iter().filter(|k| re.is_match(k)).collect(),
        None => keys,
    }
}
