//! Block parameter maps.
//!
//! Parameters arrive from diagram files as loosely typed JSON/YAML values and
//! are read through typed accessors that report the offending key.

use std::collections::BTreeMap;

use bf_core::{BlockError, BlockResult, Value};
use serde::{Deserialize, Serialize};

/// Named block parameters, e.g. `{ k: 10 }` or `{ num: [0.5], den: [2, 1] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, serde_json::Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Required number.
    pub fn f64(&self, key: &str) -> BlockResult<f64> {
        match self.get(key) {
            Some(v) => as_f64(key, v),
            None => Err(missing(key)),
        }
    }

    pub fn f64_or(&self, key: &str, default: f64) -> BlockResult<f64> {
        self.get(key).map_or(Ok(default), |v| as_f64(key, v))
    }

    pub fn opt_f64(&self, key: &str) -> BlockResult<Option<f64>> {
        self.get(key).map(|v| as_f64(key, v)).transpose()
    }

    pub fn usize_or(&self, key: &str, default: usize) -> BlockResult<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| invalid(key, "a non-negative integer")),
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> BlockResult<&'a str> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_str().ok_or_else(|| invalid(key, "a string")),
        }
    }

    /// Required list of numbers. A bare number is read as a one-element list.
    pub fn f64_list(&self, key: &str) -> BlockResult<Vec<f64>> {
        match self.get(key) {
            Some(serde_json::Value::Array(items)) => {
                items.iter().map(|v| as_f64(key, v)).collect()
            }
            Some(v) => Ok(vec![as_f64(key, v)?]),
            None => Err(missing(key)),
        }
    }

    /// Signal value: a number is a scalar, a list is a vector.
    pub fn value_or(&self, key: &str, default: Value) -> BlockResult<Value> {
        match self.get(key) {
            None => Ok(default),
            Some(serde_json::Value::Array(_)) => Ok(Value::vector(self.f64_list(key)?)),
            Some(v) => Ok(Value::scalar(as_f64(key, v)?)),
        }
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn as_f64(key: &str, v: &serde_json::Value) -> BlockResult<f64> {
    v.as_f64().ok_or_else(|| invalid(key, "a number"))
}

fn missing(key: &str) -> BlockError {
    BlockError::config(format!("missing parameter '{key}'"))
}

fn invalid(key: &str, expected: &str) -> BlockError {
    BlockError::config(format!("parameter '{key}' must be {expected}"))
}
