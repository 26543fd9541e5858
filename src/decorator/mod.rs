//! Decorator Module
//!
//! Wraps async operations with result caching, targeted invalidation and
//! whole-namespace clearing on top of a shared backend.
//!
//! # Operations
//! - `cached` - serve from the backend or compute and store
//! - `invalidate` / `invalidate_many` - delete another function's entries first
//! - `invalidate_all` - clear the backend first
//!
//! Backend failures never reach the caller: every operation is fail-open.

mod binding;
mod cache;
mod clear;
mod invalidate;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::backend::{CacheBackend, InMemoryBackend, SharedBackend};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};

#[cfg(feature = "redis")]
use crate::backend::{ClusterBackend, RedisBackend};
#[cfg(feature = "redis")]
use crate::config::{ClusterConfig, RedisConfig};

// Re-export public types
pub use binding::CacheBinding;
pub use invalidate::Invalidation;

// == Cache Decorator ==
/// Caching policy bound to one backend and one default TTL.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct CacheDecorator {
    backend: SharedBackend,
    default_ttl: Option<Duration>,
}

impl fmt::Debug for CacheDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDecorator")
            .field("backend", &self.backend.name())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl CacheDecorator {
    // == Constructors ==
    /// Wraps an already shared backend. `None` TTL stores results forever.
    pub fn new(backend: SharedBackend, default_ttl: Option<Duration>) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    /// Wraps any backend value.
    pub fn from_backend<B>(backend: B, default_ttl: Option<Duration>) -> Self
    where
        B: CacheBackend + 'static,
    {
        Self::new(Arc::new(backend), default_ttl)
    }

    /// Decorator over a fresh in-process namespace.
    pub fn in_memory(default_ttl: Option<Duration>) -> Self {
        Self::from_backend(InMemoryBackend::new(), default_ttl)
    }

    /// Decorator over a single networked node.
    #[cfg(feature = "redis")]
    pub async fn redis(config: RedisConfig, default_ttl: Option<Duration>) -> Result<Self> {
        Ok(Self::from_backend(RedisBackend::connect(config).await?, default_ttl))
    }

    /// Decorator over a networked cluster.
    #[cfg(feature = "redis")]
    pub async fn cluster(config: ClusterConfig, default_ttl: Option<Duration>) -> Result<Self> {
        Ok(Self::from_backend(ClusterBackend::connect(config).await?, default_ttl))
    }

    /// Builds the backend selected by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let decorator = match config.backend {
            BackendKind::Memory => Self::in_memory(config.default_ttl),
            #[cfg(feature = "redis")]
            BackendKind::Redis => Self::redis(config.redis.clone(), config.default_ttl).await?,
            #[cfg(feature = "redis")]
            BackendKind::Cluster => {
                Self::cluster(config.cluster.clone(), config.default_ttl).await?
            }
            #[cfg(not(feature = "redis"))]
            other => {
                return Err(CacheError::Config(format!(
                    "Backend {:?} requires the `redis` feature",
                    other
                )))
            }
        };
        info!(
            "Cache decorator ready: backend={}, default_ttl={:?}",
            decorator.backend.name(),
            decorator.default_ttl
        );
        Ok(decorator)
    }

    // == Accessors ==
    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}

/// Logs a swallowed backend failure; connection-class errors at `warn`.
fn log_backend_failure(context: &str, subject: &str, err: &CacheError) {
    if err.is_connection_issue() {
        warn!(
            "Backend connection or timeout issue in {} ({}): {}, falling back",
            context, subject, err
        );
    } else {
        error!("Error in {} ({}): {}", context, subject, err);
    }
}
