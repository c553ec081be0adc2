//! Lock primitive (mutual exclusion with lease)
//!
//! State machine: Free -> Held(owner, expiry) -> Free. A lock item exists
//! iff the lock is currently held by its `value` owner; absence means free.
//! Mutual exclusion is expressed entirely as store-level conditions - no
//! client-side locking.
//!
//! # Re-entrancy
//!
//! `LockConfig::reentrant` selects the acquire condition:
//! - re-entrant (default): absent OR already owned by the caller
//! - strict: absent only
//!
//! # Lazy TTL
//!
//! An expired lock item may still be physically present until the store's
//! sweep removes it, and it still satisfies the "absent" condition check as
//! held. Callers relying on TTL for liveness should compare `check`'s
//! reported deadline against the current time rather than trusting absence.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabula_core::constants::{LOCK_BACKOFF_FACTOR, LOCK_BACKOFF_INITIAL_SECS, LOCK_BACKOFF_MAX_SECS};
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tabula_store::{Condition, Mutation, TableStore};
use tracing::debug;

use crate::keys;

/// Policy knobs for the lock primitive.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    /// Allow the current owner to re-acquire its own lock. When false,
    /// acquisition requires strict absence.
    pub reentrant: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { reentrant: true }
    }
}

/// A granted lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    /// Lock name.
    pub name: String,
    /// Owner holding the lease.
    pub owner: String,
    /// Absolute epoch-seconds expiry of the lease.
    pub ttl: u64,
    /// Epoch seconds at acquisition.
    pub acquired_at: u64,
}

/// Current state reported by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    /// Owner holding the lease.
    pub owner: String,
    /// Absolute epoch-seconds expiry, if one was set.
    pub ttl: Option<u64>,
    /// Epoch seconds at acquisition, if recorded.
    pub acquired_at: Option<u64>,
}

/// Outcome of a release. Release is idempotent: losing the owner condition
/// is reported as `NotOwned`, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// The lock was held by the caller and is now free.
    Released,
    /// The lock was absent or held by someone else; nothing was changed.
    NotOwned,
}

/// Default owner id derived from the host and process.
pub fn default_owner() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());
    format!("{host}-{}", std::process::id())
}

/// Distributed lock facade.
#[derive(Clone)]
pub struct Lock {
    store: Arc<dyn TableStore>,
    config: LockConfig,
}

impl Lock {
    /// Create a lock facade with the default (re-entrant) policy.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_config(store, LockConfig::default())
    }

    /// Create a lock facade with an explicit policy.
    pub fn with_config(store: Arc<dyn TableStore>, config: LockConfig) -> Self {
        Self { store, config }
    }

    /// Acquire the lock, waiting up to `wait` with exponential backoff.
    ///
    /// With `wait` of zero this is a single attempt. Retries sleep
    /// 0.1s * 2^attempt, capped at 5s per attempt and bounded by the total
    /// elapsed time. Signals `LockUnavailable` once the deadline elapses.
    pub fn acquire(
        &self,
        name: &str,
        ttl: u64,
        owner: &str,
        wait: Duration,
    ) -> TabulaResult<LockGrant> {
        keys::validate_key(name)?;

        if wait.is_zero() {
            return self
                .try_acquire(name, ttl, owner)
                .map_err(|err| match err {
                    TabulaError::ConditionFailed { .. } => TabulaError::lock_unavailable(name),
                    other => other,
                });
        }

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.try_acquire(name, ttl, owner) {
                Ok(grant) => return Ok(grant),
                Err(err) if err.is_condition_failed() => {
                    let elapsed = started.elapsed();
                    if elapsed >= wait {
                        return Err(TabulaError::lock_unavailable(name));
                    }
                    let backoff = (LOCK_BACKOFF_INITIAL_SECS
                        * LOCK_BACKOFF_FACTOR.powi(attempt as i32))
                    .min(LOCK_BACKOFF_MAX_SECS);
                    let remaining = wait - elapsed;
                    let sleep = Duration::from_secs_f64(backoff).min(remaining);
                    debug!(name, owner, attempt, sleep_ms = sleep.as_millis() as u64, "lock contended, backing off");
                    std::thread::sleep(sleep);
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn try_acquire(&self, name: &str, ttl: u64, owner: &str) -> TabulaResult<LockGrant> {
        let pk = keys::lock_key(name);
        let now = clock::now_seconds();
        let deadline = now.saturating_add(ttl);

        let item = Item::new(&pk, &pk, ItemType::Lock, Value::from(owner), now)
            .with_ttl(deadline)
            .with_meta("acquired_at", now)
            .with_meta("owner", owner);

        let condition = if self.config.reentrant {
            Condition::AbsentOrValueEquals(Value::from(owner))
        } else {
            Condition::Absent
        };

        self.store.put(item, Some(&condition))?;
        Ok(LockGrant {
            name: name.to_string(),
            owner: owner.to_string(),
            ttl: deadline,
            acquired_at: now,
        })
    }

    /// Release the lock. Idempotent: a lock that is absent or owned by
    /// someone else is reported as `NotOwned`, not an error.
    pub fn release(&self, name: &str, owner: &str) -> TabulaResult<ReleaseOutcome> {
        let pk = keys::lock_key(name);
        let condition = Condition::ValueEquals(Value::from(owner));
        match self.store.delete(&pk, &pk, Some(&condition)) {
            Ok(_) => Ok(ReleaseOutcome::Released),
            Err(err) if err.is_condition_failed() => Ok(ReleaseOutcome::NotOwned),
            Err(other) => Err(other),
        }
    }

    /// Extend the lease TTL. Fails with `ConditionFailed` if the caller is
    /// not the owner or the lock is absent. Returns the new deadline.
    pub fn extend(&self, name: &str, ttl: u64, owner: &str) -> TabulaResult<u64> {
        let pk = keys::lock_key(name);
        let now = clock::now_seconds();
        let deadline = now.saturating_add(ttl);
        let condition = Condition::ValueEquals(Value::from(owner));
        self.store
            .update(
                &pk,
                &pk,
                &[Mutation::SetTtl { ttl: deadline }],
                Some(&condition),
                ItemType::Lock,
            )
            .map_err(|err| match err {
                TabulaError::ConditionFailed { .. } => TabulaError::condition_failed(name),
                other => other,
            })?;
        Ok(deadline)
    }

    /// Check whether the lock is held. `None` means free.
    pub fn check(&self, name: &str) -> TabulaResult<Option<LockStatus>> {
        let pk = keys::lock_key(name);
        let Some(item) = self.store.get(&pk, &pk)? else {
            return Ok(None);
        };
        let acquired_at = item
            .metadata
            .get("acquired_at")
            .and_then(|v| v.as_u64());
        Ok(Some(LockStatus {
            owner: item.value.as_str().unwrap_or_default().to_string(),
            ttl: item.ttl,
            acquired_at,
        }))
    }
}
