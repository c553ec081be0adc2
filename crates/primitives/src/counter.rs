//! Counter primitive
//!
//! Integers under `counter:{key}`, mutated only via the store's atomic ADD.
//! Concurrent increments from N callers never lose updates: the final value
//! equals the initial value plus the sum of all applied deltas, for any
//! interleaving.

use std::sync::Arc;
use tabula_core::{ItemType, TabulaError, TabulaResult};
use tabula_store::{Condition, Mutation, TableStore};

use crate::keys;

/// Counter facade.
#[derive(Clone)]
pub struct Counter {
    store: Arc<dyn TableStore>,
}

impl Counter {
    /// Create a new counter facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Atomically add `by` to the counter and return the new value.
    ///
    /// Unless `create` is set, the counter must already exist; incrementing
    /// a missing counter signals `KeyNotFound`. With `create`, a missing
    /// counter starts at zero.
    pub fn increment(&self, key: &str, by: i64, create: bool) -> TabulaResult<i64> {
        keys::validate_key(key)?;
        self.apply(key, by, create)
    }

    /// Atomically subtract `by` from the counter and return the new value.
    ///
    /// Decrement never auto-creates: a missing counter signals
    /// `KeyNotFound`. `i64::MIN` has no absolute value and is rejected as
    /// `InvalidInput`.
    pub fn decrement(&self, key: &str, by: i64) -> TabulaResult<i64> {
        keys::validate_key(key)?;
        let magnitude = by
            .checked_abs()
            .ok_or_else(|| TabulaError::invalid_input("decrement amount out of range"))?;
        self.apply(key, -magnitude, false)
    }

    /// Read the current value. Signals `KeyNotFound` when absent.
    pub fn read(&self, key: &str) -> TabulaResult<i64> {
        let pk = keys::counter_key(key);
        let item = self
            .store
            .get(&pk, &pk)?
            .ok_or_else(|| TabulaError::key_not_found(key))?;
        item.value
            .as_int()
            .ok_or_else(|| TabulaError::store(format!("counter '{key}' holds a non-numeric value")))
    }

    fn apply(&self, key: &str, delta: i64, create: bool) -> TabulaResult<i64> {
        let pk = keys::counter_key(key);
        let condition = (!create).then_some(Condition::Exists);
        let item = self
            .store
            .update(
                &pk,
                &pk,
                &[Mutation::Add { delta }],
                condition.as_ref(),
                ItemType::Counter,
            )
            .map_err(|err| match err {
                TabulaError::ConditionFailed { .. } => TabulaError::key_not_found(key),
                other => other,
            })?;
        item.value
            .as_int()
            .ok_or_else(|| TabulaError::store(format!("counter '{key}' holds a non-numeric value")))
    }
}
