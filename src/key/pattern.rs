//! Invalidation Pattern Module
//!
//! Builds the regular expression an invalidating call uses to find the
//! stored keys of another function.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::error::Result;
use crate::key::codec::value_text;
use crate::key::Call;

// == Param Mapping ==
/// Maps a target function's parameter name to the invoking call's parameter
/// name, e.g. `user_id -> customer_id`.
///
/// Entries iterate in target-name order, the same order keyword arguments
/// take in rendered keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMapping {
    pairs: BTreeMap<String, String>,
}

impl ParamMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `target <- source` pair.
    pub fn map(mut self, target_param: impl Into<String>, source_param: impl Into<String>) -> Self {
        self.pairs.insert(target_param.into(), source_param.into());
        self
    }

    /// Maps each name onto itself.
    pub fn same<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pairs = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                (name.clone(), name)
            })
            .collect();
        Self { pairs }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<T, S> FromIterator<(T, S)> for ParamMapping
where
    T: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, S)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(t, s)| (t.into(), s.into())).collect(),
        }
    }
}

impl<T, S, const N: usize> From<[(T, S); N]> for ParamMapping
where
    T: Into<String>,
    S: Into<String>,
{
    fn from(pairs: [(T, S); N]) -> Self {
        pairs.into_iter().collect()
    }
}

// == Invalidation Pattern ==
/// Compiled pattern selecting the keys of `target` to delete.
///
/// Without a mapping every key of `target` matches. With a mapping, each
/// mapped value present among the invoking call's keyword arguments must
/// appear as a `'param': value` substring in the key's keyword segment.
/// Matching is textual: a mapped pair nested inside some other argument's
/// rendering also matches.
#[derive(Debug, Clone)]
pub struct InvalidationPattern {
    target: String,
    regex: Regex,
}

impl InvalidationPattern {
    // == Constructors ==
    /// Pattern matching every cached key of `target`.
    pub fn for_function(target: &str) -> Result<Self> {
        Self::compile(target, &[])
    }

    /// Pattern for `target` scoped by `mapping` over the values in `call`.
    pub fn build(target: &str, mapping: Option<&ParamMapping>, call: &Call) -> Result<Self> {
        let fragments: Vec<(&str, String)> = match mapping {
            Some(mapping) => mapping
                .iter()
                .filter_map(|(target_param, source_param)| {
                    call.kwarg_value(source_param)
                        .map(|value| (target_param, value_text(value)))
                })
                .collect(),
            None => Vec::new(),
        };
        Self::compile(target, &fragments)
    }

    fn compile(target: &str, fragments: &[(&str, String)]) -> Result<Self> {
        let mut re = format!(r"(?s)^{}:\(.*\):\{{", regex::escape(target));
        if fragments.is_empty() {
            re.push_str(r".*\}$");
        } else {
            for (param, value) in fragments {
                re.push_str(&format!(
                    r".*'{}':\s*{}(?:, |\}})",
                    regex::escape(param),
                    regex::escape(value)
                ));
            }
            re.push_str(".*$");
        }

        Ok(Self {
            target: target.to_string(),
            regex: Regex::new(&re)?,
        })
    }

    // == Accessors ==
    /// Target function name; also the prefix used to scope enumeration.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

impl fmt::Display for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
