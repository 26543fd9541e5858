//! Cacheable - method-level async result caching
//!
//! Caches operation results under keys derived from the call signature,
//! invalidates them by pattern, and stores them in memory or on a
//! Redis-protocol server or cluster.

pub mod backend;
pub mod config;
pub mod decorator;
pub mod error;
pub mod key;

pub use backend::{CacheBackend, InMemoryBackend, SharedBackend};
pub use config::{BackendKind, ClusterConfig, Config, RedisConfig};
pub use decorator::{CacheBinding, CacheDecorator, Invalidation};
pub use error::{CacheError, Result};
pub use key::{build_key, Call, InvalidationPattern, ParamMapping};

#[cfg(feature = "redis")]
pub use backend::{ClusterBackend, RedisBackend};
