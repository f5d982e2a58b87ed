//! Request parameter normalization.
//!
//! Wraps the raw query-string pairs in a mapping whose keys are uniformly
//! lower-cased, so the planner never has to care about parameter casing.

use std::collections::HashMap;

/// A query parameter value: a single string, or the ordered sequence a
/// repeated parameter accumulates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// Effective scalar value. Repeated parameters resolve to the last
    /// occurrence.
    pub fn as_str(&self) -> &str {
        match self {
            ParamValue::Single(value) => value,
            ParamValue::Many(values) => values.last().map(String::as_str).unwrap_or(""),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(first) => {
                *self = ParamValue::Many(vec![std::mem::take(first), value]);
            }
            ParamValue::Many(values) => values.push(value),
        }
    }
}

/// Request parameters with case-normalized keys.
///
/// Keys are lower-cased on insertion. Keys that collide after lower-casing
/// accumulate like ordinary repeats, so scalar reads see the last value
/// written — an explicit policy, not an accident of map ordering.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    entries: HashMap<String, ParamValue>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw key/value pairs in arrival order.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(&key, value);
        }
        params
    }

    /// Record one occurrence of a parameter. Values pass through unchanged.
    pub fn insert(&mut self, key: &str, value: String) {
        let key = key.to_lowercase();
        match self.entries.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                self.entries.insert(key, ParamValue::Single(value));
            }
        }
    }

    /// Scalar value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(ParamValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
