//! Cache Decorator
//!
//! Read-through caching of async operation results.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::decorator::{log_backend_failure, CacheDecorator};
use crate::error::CacheError;
use crate::key::Call;

/// Why the cached path gave up.
enum Failure<E> {
    Backend(CacheError),
    Operation(E),
}

impl<E> From<CacheError> for Failure<E> {
    fn from(err: CacheError) -> Self {
        Failure::Backend(err)
    }
}

impl CacheDecorator {
    // == Cached ==
    /// Returns the cached result for `call`, or runs `op` and caches it.
    ///
    /// A live entry is returned without running `op`. On a miss `op` runs
    /// and its result is stored with `ttl` (or the default TTL) unless it
    /// serializes to JSON `null`, which is never stored.
    ///
    /// Any failure on that path (backend read or write, payload decode, or
    /// `op` itself) is logged and `op` is run once more directly; that
    /// second outcome is returned as is. A backend outage therefore costs
    /// an extra run of `op`, and a failing `op` runs twice.
    pub async fn cached<R, E, F, Fut>(
        &self,
        call: &Call,
        ttl: Option<Duration>,
        op: F,
    ) -> std::result::Result<R, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: Serialize + DeserializeOwned,
    {
        let key = call.key().render();
        let ttl = ttl.or(self.default_ttl);

        match self.read_through(&key, ttl, &op).await {
            Ok(value) => Ok(value),
            Err(Failure::Backend(err)) => {
                log_backend_failure("cache decorator", &key, &err);
                op().await
            }
            Err(Failure::Operation(_)) => {
                error!("Operation failed inside cache decorator ({}), retrying uncached", key);
                op().await
            }
        }
    }

    async fn read_through<R, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        op: &F,
    ) -> std::result::Result<R, Failure<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: Serialize + DeserializeOwned,
    {
        if let Some(raw) = self.backend.get(key).await? {
            let value = serde_json::from_str(&raw).map_err(CacheError::from)?;
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        debug!("Cache miss: {}", key);
        let result = op().await.map_err(Failure::Operation)?;

        let encoded = serde_json::to_value(&result).map_err(CacheError::from)?;
        if encoded.is_null() {
            debug!("Null result not cached: {}", key);
        } else {
            self.backend.set(key, &encoded.to_string(), ttl).await?;
        }
        Ok(result)
    }
}
