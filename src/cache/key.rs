//! Cache key generation.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Key for a cached request: the fully-resolved URL joined with a deterministic
/// serialization of the request options.
///
/// The raw URL stays readable inside the key so whole resource families can be
/// invalidated by substring (e.g. every `/api/conversations` entry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build a key from a resolved URL and request options.
    ///
    /// Object keys are sorted before serializing, so the same options produce
    /// the same key regardless of map insertion order.
    pub fn for_request<O: Serialize + ?Sized>(url: &str, options: &O) -> Self {
        let canonical = serde_json::to_value(options)
            .map(canonicalize)
            .and_then(|v| serde_json::to_string(&v))
            .unwrap_or_default();
        Self(format!("{}_{}", url, canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
