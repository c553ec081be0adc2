//! Key-Value primitive
//!
//! Opaque string values under `kv:{key}`. Stateless facade: holds only an
//! `Arc<dyn TableStore>`; clones sharing a store see the same data.

use std::sync::Arc;
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tabula_store::{Condition, TableStore};
use tracing::debug;

use crate::keys;

/// Key-value store facade.
#[derive(Clone)]
pub struct Kv {
    store: Arc<dyn TableStore>,
}

impl Kv {
    /// Create a new KV facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Set a key-value pair.
    ///
    /// With `if_not_exists`, the put is conditioned on the key being absent
    /// and a collision surfaces as `AlreadyExists`. Otherwise this is an
    /// unconditional upsert. `ttl` is seconds from now.
    pub fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<u64>,
        if_not_exists: bool,
    ) -> TabulaResult<()> {
        keys::validate_key(key)?;
        let pk = keys::kv_key(key);
        let now = clock::now_seconds();

        let mut item = Item::new(&pk, &pk, ItemType::Kv, Value::from(value), now);
        if let Some(ttl) = ttl {
            item = item.with_ttl(now.saturating_add(ttl));
        }

        let condition = if_not_exists.then_some(Condition::Absent);
        self.store
            .put(item, condition.as_ref())
            .map_err(|err| match err {
                TabulaError::ConditionFailed { .. } => TabulaError::already_exists(key),
                other => other,
            })
    }

    /// Get a value by key.
    ///
    /// Returns `default` when the key is absent and a default was supplied;
    /// otherwise signals `KeyNotFound`.
    pub fn get(&self, key: &str, default: Option<&str>) -> TabulaResult<String> {
        let pk = keys::kv_key(key);
        match self.store.get(&pk, &pk)? {
            Some(item) => Ok(item.value.as_str().unwrap_or_default().to_string()),
            None => match default {
                Some(value) => Ok(value.to_string()),
                None => Err(TabulaError::key_not_found(key)),
            },
        }
    }

    /// Delete a key. Idempotent: absence is success, not an error.
    ///
    /// With `if_value_equals`, the delete is conditioned on the stored value
    /// matching, and a mismatch (or absence) signals `ConditionFailed`.
    /// Returns whether an item was actually removed.
    pub fn delete(&self, key: &str, if_value_equals: Option<&str>) -> TabulaResult<bool> {
        let pk = keys::kv_key(key);
        let condition = if_value_equals.map(|v| Condition::ValueEquals(Value::from(v)));
        let previous = self
            .store
            .delete(&pk, &pk, condition.as_ref())
            .map_err(|err| match err {
                TabulaError::ConditionFailed { .. } => TabulaError::condition_failed(key),
                other => other,
            })?;
        debug!(key, removed = previous.is_some(), "kv delete");
        Ok(previous.is_some())
    }

    /// Check whether a key exists.
    pub fn exists(&self, key: &str) -> TabulaResult<bool> {
        let pk = keys::kv_key(key);
        Ok(self.store.get(&pk, &pk)?.is_some())
    }

    /// List keys starting with `prefix`, returning (key, value) pairs in
    /// key order, optionally truncated to `limit`.
    pub fn list_by_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> TabulaResult<Vec<(String, String)>> {
        let items = self.store.scan(&keys::kv_key(prefix))?;
        let take = limit.unwrap_or(usize::MAX);
        Ok(items
            .into_iter()
            .take(take)
            .map(|item| {
                let (_, key) = keys::parse_key(&item.pk);
                let value = item.value.as_str().unwrap_or_default().to_string();
                (key.to_string(), value)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_store::MemoryStore;

    fn setup() -> Kv {
        Kv::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn set_and_get() {
        let kv = setup();
        kv.set("greeting", "hello", None, false).unwrap();
        assert_eq!(kv.get("greeting", None).unwrap(), "hello");
    }

    #[test]
    fn get_missing_returns_default_or_error() {
        let kv = setup();
        assert_eq!(kv.get("missing", Some("fallback")).unwrap(), "fallback");
        let err = kv.get("missing", None).unwrap_err();
        assert_eq!(err, TabulaError::key_not_found("missing"));
    }

    #[test]
    fn if_not_exists_collides() {
        let kv = setup();
        kv.set("once", "1", None, true).unwrap();
        let err = kv.set("once", "2", None, true).unwrap_err();
        assert_eq!(err, TabulaError::already_exists("once"));
        // Value unchanged.
        assert_eq!(kv.get("once", None).unwrap(), "1");
    }

    #[test]
    fn upsert_overwrites() {
        let kv = setup();
        kv.set("k", "1", None, false).unwrap();
        kv.set("k", "2", None, false).unwrap();
        assert_eq!(kv.get("k", None).unwrap(), "2");
    }

    #[test]
    fn delete_is_idempotent() {
        let kv = setup();
        kv.set("temp", "v", None, false).unwrap();
        assert!(kv.delete("temp", None).unwrap());
        // Second delete reports success with nothing removed.
        assert!(!kv.delete("temp", None).unwrap());
    }

    #[test]
    fn conditional_delete_checks_value() {
        let kv = setup();
        kv.set("guarded", "expected", None, false).unwrap();

        let err = kv.delete("guarded", Some("wrong")).unwrap_err();
        assert_eq!(err, TabulaError::condition_failed("guarded"));
        assert!(kv.exists("guarded").unwrap());

        assert!(kv.delete("guarded", Some("expected")).unwrap());
        assert!(!kv.exists("guarded").unwrap());
    }

    #[test]
    fn list_by_prefix_filters_and_limits() {
        let kv = setup();
        kv.set("user:alice", "a", None, false).unwrap();
        kv.set("user:bob", "b", None, false).unwrap();
        kv.set("config:x", "c", None, false).unwrap();

        let users = kv.list_by_prefix("user:", None).unwrap();
        assert_eq!(
            users,
            vec![
                ("user:alice".to_string(), "a".to_string()),
                ("user:bob".to_string(), "b".to_string()),
            ]
        );

        let limited = kv.list_by_prefix("user:", Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn ttl_is_stored_as_absolute_deadline() {
        let store = Arc::new(MemoryStore::new());
        let kv = Kv::new(store.clone());
        kv.set("expiring", "v", Some(60), false).unwrap();

        let item = store.get("kv:expiring", "kv:expiring").unwrap().unwrap();
        let deadline = item.ttl.unwrap();
        assert!(deadline >= item.created_at + 60);
    }

    #[test]
    fn clones_share_data() {
        let kv = setup();
        let clone = kv.clone();
        kv.set("shared", "v", None, false).unwrap();
        assert_eq!(clone.get("shared", None).unwrap(), "v");
    }
}
