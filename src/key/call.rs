//! Call Signature Module
//!
//! Captures the identity and arguments of one invocation of a cached or
//! invalidating operation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::key::CacheKey;

// == Call ==
/// One invocation: function name, positional arguments, keyword arguments.
///
/// Keyword arguments are kept sorted by name so that two calls supplying the
/// same names and values in a different order derive the same key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    function: String,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl Call {
    // == Constructor ==
    /// Creates a call to `function` with no arguments.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    // == Builders ==
    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing any previous value under `name`.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Appends a positional argument from any serializable value.
    pub fn arg_serialized<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.arg(serde_json::to_value(value)?))
    }

    /// Sets a keyword argument from any serializable value.
    pub fn kwarg_serialized<T: Serialize + ?Sized>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        Ok(self.kwarg(name, serde_json::to_value(value)?))
    }

    /// Prepends an instance-context value as the first positional argument.
    ///
    /// Used for methods: the receiver takes part in key derivation so that
    /// two objects sharing a backend do not share entries.
    pub fn with_receiver(mut self, context: impl Into<Value>) -> Self {
        self.args.insert(0, context.into());
        self
    }

    // == Accessors ==
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    /// Looks up a keyword argument by name.
    pub fn kwarg_value(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    // == Key ==
    /// Derives the structured cache key for this call.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.function.clone(), self.args.clone(), self.kwargs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_arguments() {
        let call = Call::new("get_user").arg(1).arg("x").kwarg("active", true);

        assert_eq!(call.function(), "get_user");
        assert_eq!(call.args(), &[json!(1), json!("x")]);
        assert_eq!(call.kwarg_value("active"), Some(&json!(true)));
        assert!(call.kwarg_value("missing").is_none());
    }

    #[test]
    fn test_kwarg_overwrite() {
        let call = Call::new("f").kwarg("a", 1).kwarg("a", 2);
        assert_eq!(call.kwargs().len(), 1);
        assert_eq!(call.kwarg_value("a"), Some(&json!(2)));
    }

    #[test]
    fn test_receiver_goes_first() {
        let call = Call::new("get_user").arg(7).with_receiver("repo");
        assert_eq!(call.args(), &[json!("repo"), json!(7)]);
    }

    #[test]
    fn test_serialized_arguments() {
        #[derive(Serialize)]
        struct Filter {
            team: &'static str,
        }

        let call = Call::new("list")
            .arg_serialized(&Filter { team: "core" })
            .unwrap()
            .kwarg_serialized("ids", &[1, 2])
            .unwrap();

        assert_eq!(call.args(), &[json!({"team": "core"})]);
        assert_eq!(call.kwarg_value("ids"), Some(&json!([1, 2])));
    }
}
