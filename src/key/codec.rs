//! Key Codec Module
//!
//! Maps a call signature to its storage key.
//!
//! The text form is `name:(pos1, pos2):{'k1': v1, 'k2': v2}`. Invalidation
//! patterns match on this exact shape, so any change here must be mirrored
//! in `key::pattern`.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde_json::Value;

// == Separators ==
/// Separator between the function name and each argument segment
pub const SEGMENT_SEPARATOR: char = ':';

// == Cache Key ==
/// Structured form of a storage key.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    function: String,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl CacheKey {
    pub fn new(function: String, args: Vec<Value>, kwargs: BTreeMap<String, Value>) -> Self {
        Self {
            function,
            args,
            kwargs,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Renders the key to its storage text.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_key(&self.function, &self.args, &self.kwargs))
    }
}

// == Build Key ==
/// Builds the storage key for a function and its arguments.
///
/// No escaping is applied: argument text containing `:`, `(` or `{` can make
/// two different calls render ambiguously.
pub fn build_key(function_name: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> String {
    let mut out = String::with_capacity(function_name.len() + 16);
    out.push_str(function_name);
    out.push(SEGMENT_SEPARATOR);
    render_positional(args, &mut out);
    out.push(SEGMENT_SEPARATOR);
    render_keywords(kwargs, &mut out);
    out
}

// == Rendering ==
/// Renders positional arguments as `(a, b, c)`; no arguments render as `()`.
pub fn render_positional(args: &[Value], out: &mut String) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_value(arg, out);
    }
    out.push(')');
}

/// Renders keyword arguments as `{'a': 1, 'b': 'x'}`; none render as `{}`.
pub fn render_keywords(kwargs: &BTreeMap<String, Value>, out: &mut String) {
    out.push('{');
    for (i, (name, value)) in kwargs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_entry(name, value, out);
    }
    out.push('}');
}

/// Renders one `'name': value` pair.
pub fn render_entry(name: &str, value: &Value, out: &mut String) {
    out.push('\'');
    out.push_str(name);
    out.push_str("': ");
    render_value(value, out);
}

/// Renders a single value in its default textual form.
///
/// Strings are single-quoted, numbers and booleans bare, sequences as
/// `[..]` and maps as `{'k': v}`.
pub fn render_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (name, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_entry(name, item, out);
            }
            out.push('}');
        }
    }
}

/// Convenience wrapper returning the rendered value as a new string.
pub fn value_text(value: &Value) -> String {
    let mut out = String::new();
    render_value(value, &mut out);
    out
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Call;
    use serde_json::json;

    #[test]
    fn test_key_without_arguments() {
        assert_eq!(build_key("list_all", &[], &BTreeMap::new()), "list_all:():{}");
    }

    #[test]
    fn test_key_shape() {
        let key = Call::new("get_user")
            .arg(1)
            .arg("b")
            .kwarg("user_id", 42)
            .kwarg("active", true)
            .key()
            .render();

        assert_eq!(key, "get_user:(1, 'b'):{'active': true, 'user_id': 42}");
    }

    #[test]
    fn test_display_matches_build_key() {
        let call = Call::new("f").arg(json!([1, "x"])).kwarg("m", json!({"a": null}));
        let from_fn = build_key(call.function(), call.args(), call.kwargs());
        assert_eq!(call.key().to_string(), from_fn);
        assert_eq!(from_fn, "f:([1, 'x']):{'m': {'a': null}}");
    }

    #[test]
    fn test_keyword_order_independent() {
        let a = Call::new("f").kwarg("x", 1).kwarg("y", 2).key().render();
        let b = Call::new("f").kwarg("y", 2).kwarg("x", 1).key().render();
        assert_eq!(a, b);
    }

    #[test]
    fn test_positional_order_matters() {
        let a = Call::new("f").arg(1).arg("b").key().render();
        let b = Call::new("f").arg("b").arg(1).key().render();
        assert_ne!(a, b);
    }

    #[test]
    fn test_string_and_number_differ() {
        let a = Call::new("f").arg(1).key().render();
        let b = Call::new("f").arg("1").key().render();
        assert_ne!(a, b);
    }

    #[test]
    fn test_function_name_is_prefix() {
        let key = Call::new("get_user").arg(1).key().render();
        assert!(key.starts_with("get_user:"));
    }

    #[test]
    fn test_separator_in_value_is_not_escaped() {
        // values are embedded verbatim
        let key = Call::new("f").arg("a):{").key().render();
        assert_eq!(key, "f:('a):{'):{}");
    }
}
