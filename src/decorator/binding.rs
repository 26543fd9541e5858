//! Late-bound decorator access for method-style operations.
//!
//! A component that owns cached methods holds a `CacheBinding`. Until a
//! decorator is attached, every wrapped call fails with
//! [`CacheError::NotInitialized`] before touching any backend.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::decorator::{CacheDecorator, Invalidation};
use crate::error::{CacheError, Result};
use crate::key::{Call, ParamMapping};

// == Cache Binding ==
/// Optional decorator plus an optional per-instance context.
///
/// The context is prepended as the first positional argument of every call,
/// so two instances with different contexts never share entries.
#[derive(Debug, Clone, Default)]
pub struct CacheBinding {
    decorator: Option<CacheDecorator>,
    context: Option<Value>,
}

impl CacheBinding {
    pub fn new(decorator: CacheDecorator) -> Self {
        Self {
            decorator: Some(decorator),
            context: None,
        }
    }

    /// Binding with no decorator attached yet.
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attaches (or replaces) the decorator.
    pub fn bind(&mut self, decorator: CacheDecorator) {
        self.decorator = Some(decorator);
    }

    pub fn is_bound(&self) -> bool {
        self.decorator.is_some()
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn decorator(&self) -> Result<&CacheDecorator> {
        self.decorator.as_ref().ok_or_else(|| {
            CacheError::NotInitialized(
                "cache decorator is not attached to this component".to_string(),
            )
        })
    }

    fn scoped(&self, call: &Call) -> Call {
        match &self.context {
            Some(context) => call.clone().with_receiver(context.clone()),
            None => call.clone(),
        }
    }

    // == Wrapped Operations ==
    pub async fn cache<R, E, F, Fut>(
        &self,
        call: &Call,
        ttl: Option<Duration>,
        op: F,
    ) -> std::result::Result<R, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let decorator = self.decorator()?;
        decorator.cached(&self.scoped(call), ttl, op).await
    }

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
        E: From<CacheError>,
    {
        let decorator = self.decorator()?;
        decorator
            .invalidate(target, mapping, &self.scoped(call), op)
            .await
    }

    pub async fn invalidate_many<R, E, F, Fut>(
        &self,
        rules: &[Invalidation],
        call: &Call,
        op: F,
    ) -> std::result::Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: From<CacheError>,
    {
        let decorator = self.decorator()?;
        decorator
            .invalidate_many(rules, &self.scoped(call), op)
            .await
    }

    pub async fn invalidate_all<R, E, F, Fut>(&self, op: F) -> std::result::Result<R, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: From<CacheError>,
    {
        let decorator = self.decorator()?;
        decorator.invalidate_all(op).await
    }
}
