//! Invalidation Engine
//!
//! Deletes another function's cached entries before running an operation.

use std::future::Future;

use tracing::{debug, info};

use crate::decorator::{log_backend_failure, CacheDecorator};
use crate::error::Result;
use crate::key::codec::SEGMENT_SEPARATOR;
use crate::key::{Call, InvalidationPattern, ParamMapping};

// == Invalidation ==
/// One invalidation rule: the target function and an optional parameter
/// mapping scoping which of its entries go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    target: String,
    mapping: Option<ParamMapping>,
}

impl Invalidation {
    /// Rule dropping every entry of `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mapping: None,
        }
    }

    /// Rule dropping only the entries of `target` whose mapped keyword
    /// values equal the invoking call's.
    pub fn with_mapping(mut self, mapping: impl Into<ParamMapping>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn mapping(&self) -> Option<&ParamMapping> {
        self.mapping.as_ref()
    }

    /// Compiles this rule against the invoking call.
    pub fn pattern(&self, call: &Call) -> Result<InvalidationPattern> {
        InvalidationPattern::build(&self.target, self.mapping.as_ref(), call)
    }
}

impl CacheDecorator {
    // == Invalidate ==
    /// Deletes the matching entries of `target`, then runs `op`.
    ///
    /// Invalidation failures are logged and swallowed; `op` always runs and
    /// its result is returned unchanged.
    pub async fn invalidate<R, E, F, Fut>(
        &self,
        target: &str,
        mapping: Option<&ParamMapping>,
        call: &Call,
        op: F,
    ) -> std::result::Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        match InvalidationPattern::build(target, mapping, call) {
            Ok(pattern) => {
                self.invalidate_matching(&pattern).await;
            }
            Err(err) => log_backend_failure("invalidation", target, &err),
        }
        op().await
    }

    /// Applies every rule in order, then runs `op` once.
    pub async fn invalidate_many<R, E, F, Fut>(
        &self,
        rules: &[Invalidation],
        call: &Call,
        op: F,
    ) -> std::result::Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        for rule in rules {
            match rule.pattern(call) {
                Ok(pattern) => {
                    self.invalidate_matching(&pattern).await;
                }
                Err(err) => log_backend_failure("invalidation", rule.target(), &err),
            }
        }
        op().await
    }

    /// Deletes every key `pattern` selects and returns how many deletes
    /// succeeded. Never fails.
    pub async fn invalidate_matching(&self, pattern: &InvalidationPattern) -> usize {
        let prefix = format!("{}{}", pattern.target(), SEGMENT_SEPARATOR);
        let keys = match self
            .backend
            .keys_by_prefix(&prefix, Some(pattern.regex()))
            .await
        {
            Ok(keys) => keys,
            Err(err) => {
                log_backend_failure("invalidation", pattern.as_str(), &err);
                return 0;
            }
        };

        let mut deleted = 0;
        for key in &keys {
            match self.backend.delete(key).await {
                Ok(()) => {
                    debug!("Invalidated {}", key);
                    deleted += 1;
                }
                Err(err) => log_backend_failure("invalidation", key, &err),
            }
        }

        if deleted > 0 {
            info!("Invalidated {} entries of {}", deleted, pattern.target());
        }
        deleted
    }
}
