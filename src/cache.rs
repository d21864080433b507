//! On-disk memoization for idempotent agent calls.
//!
//! A cache entry is keyed by the canonicalized call signature: the
//! fully-qualified target name plus its arguments, re-serialized with
//! object keys sorted so that argument order does not matter, hashed to a
//! fixed-width SHA-256 hex digest. A hit short-circuits the underlying call
//! entirely; a miss executes once and stores the value atomically (write to
//! a temp file, then rename) before returning. Concurrent callers with the
//! same key are not deduplicated — the sequential runner never produces
//! them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Key for a memoized call: SHA-256 of the canonical signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey(String);

impl CallKey {
    /// Computes the key for a target and its arguments.
    pub fn compute(target: &str, args: &Value) -> Self {
        let canonical = format!("{target}({})", canonicalize(args));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable serialization of a JSON value: object keys sorted at every
/// nesting level, arrays kept in order.
fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let fields: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{v}", serde_json::to_string(k).expect("string")))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let elements: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", elements.join(","))
        }
        other => other.to_string(),
    }
}

/// Directory-backed memoization cache for JSON-serializable call results.
pub struct CallCache {
    root: PathBuf,
}

impl CallCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn entry_path(&self, key: &CallKey) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Looks up a stored result. `None` on miss.
    pub fn get(&self, key: &CallKey) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CacheError::Read {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let value = serde_json::from_str(&content).map_err(|e| CacheError::Read {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }

    /// Stores a result atomically: temp file in the cache directory, then
    /// rename onto the final path.
    pub fn store(&self, key: &CallKey, value: &Value) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(value)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(|e| CacheError::Store {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(tmp.path(), json).map_err(|e| CacheError::Store {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        tmp.persist(self.entry_path(key))
            .map_err(|e| CacheError::Store {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Cache directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_key_is_argument_order_independent() {
        let a = CallKey::compute(
            "openai_http/fruit_count",
            &json!({ "base_url": "http://x/v1", "model": "qwen" }),
        );
        let b = CallKey::compute(
            "openai_http/fruit_count",
            &json!({ "model": "qwen", "base_url": "http://x/v1" }),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_targets_and_args() {
        let args = json!({ "model": "qwen" });
        let a = CallKey::compute("openai_http/fruit_count", &args);
        let b = CallKey::compute("openai_http/towers_of_hanoi", &args);
        let c = CallKey::compute("openai_http/fruit_count", &json!({ "model": "gemma" }));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_sorts_nested_objects() {
        let a = CallKey::compute("t", &json!({ "outer": { "b": 1, "a": [{"y": 2, "x": 1}] } }));
        let b = CallKey::compute("t", &json!({ "outer": { "a": [{"x": 1, "y": 2}], "b": 1 } }));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = CallCache::new(dir.path()).unwrap();
        let key = CallKey::compute("scripted/fruit_count", &json!({ "model": "any" }));

        assert!(cache.get(&key).unwrap().is_none());

        let value = json!({ "result": { "fruit_count_by_color": { "orange": 25 } } });
        cache.store(&key, &value).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(value));
    }

    #[test]
    fn test_store_overwrites_existing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = CallCache::new(dir.path()).unwrap();
        let key = CallKey::compute("t", &json!({}));

        cache.store(&key, &json!(1)).unwrap();
        cache.store(&key, &json!(2)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(json!(2)));
    }
}
