//! Cache-Clearing Wrapper

use std::future::Future;

use tracing::info;

use crate::decorator::{log_backend_failure, CacheDecorator};

impl CacheDecorator {
    // == Invalidate All ==
    /// Wipes the backend namespace, then runs `op`.
    ///
    /// A failed wipe is logged and swallowed; `op` runs regardless.
    pub async fn invalidate_all<R, E, F, Fut>(&self, op: F) -> std::result::Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        match self.backend.clear().await {
            Ok(()) => info!("Cleared {} cache", self.backend.name()),
            Err(err) => log_backend_failure("cache clear", self.backend.name(), &err),
        }
        op().await
    }
}
