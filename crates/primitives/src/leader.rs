//! Leader election primitive
//!
//! Same item shape as a lock but with no re-entrant override and no acquire
//! backoff: `elect` is a single conditional put on absence, and lease
//! renewal (`heartbeat`) is a single conditional update so there is never a
//! window in which two agents both believe they hold leadership.

use serde::Serialize;
use std::sync::Arc;
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tabula_store::{Condition, Mutation, TableStore};
use tracing::debug;

use crate::keys;

/// A leadership lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderLease {
    /// Pool name.
    pub pool: String,
    /// Agent currently holding leadership.
    pub leader: String,
    /// Absolute epoch-seconds expiry of the lease, if set.
    pub ttl: Option<u64>,
    /// Epoch seconds at election, if recorded.
    pub elected_at: Option<u64>,
}

/// Leader election facade.
#[derive(Clone)]
pub struct Leader {
    store: Arc<dyn TableStore>,
}

impl Leader {
    /// Create a leader-election facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Attempt to become leader of the pool.
    ///
    /// Conditional put on absence; losing the race signals
    /// `LeaderElectionFailed`. An expired-but-unswept lease still counts as
    /// occupied.
    pub fn elect(&self, pool: &str, agent_id: &str, ttl: u64) -> TabulaResult<LeaderLease> {
        keys::validate_key(pool)?;
        let pk = keys::leader_key(pool);
        let now = clock::now_seconds();
        let deadline = now.saturating_add(ttl);

        let item = Item::new(&pk, &pk, ItemType::Leader, Value::from(agent_id), now)
            .with_ttl(deadline)
            .with_meta("elected_at", now);

        match self.store.put(item, Some(&Condition::Absent)) {
            Ok(()) => {
                debug!(pool, agent_id, "elected leader");
                Ok(LeaderLease {
                    pool: pool.to_string(),
                    leader: agent_id.to_string(),
                    ttl: Some(deadline),
                    elected_at: Some(now),
                })
            }
            Err(err) if err.is_condition_failed() => {
                Err(TabulaError::leader_election_failed(pool))
            }
            Err(other) => Err(other),
        }
    }

    /// Step down from leadership.
    ///
    /// Idempotent when the pool is already vacant. A pool occupied by a
    /// different agent signals `ConditionFailed`.
    pub fn resign(&self, pool: &str, agent_id: &str) -> TabulaResult<()> {
        let pk = keys::leader_key(pool);
        let condition = Condition::ValueEquals(Value::from(agent_id));
        match self.store.delete(&pk, &pk, Some(&condition)) {
            Ok(_) => Ok(()),
            Err(err) if err.is_condition_failed() => {
                // Distinguish "already vacant" (success) from "someone else
                // holds it" (condition failure).
                if self.store.get(&pk, &pk)?.is_none() {
                    Ok(())
                } else {
                    Err(TabulaError::condition_failed(pool))
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Renew the leadership lease. A single conditional update; fails with
    /// `ConditionFailed` unless the caller is the current leader. Returns
    /// the new deadline.
    pub fn heartbeat(&self, pool: &str, agent_id: &str, ttl: u64) -> TabulaResult<u64> {
        let pk = keys::leader_key(pool);
        let now = clock::now_seconds();
        let deadline = now.saturating_add(ttl);
        let condition = Condition::ValueEquals(Value::from(agent_id));
        self.store
            .update(
                &pk,
                &pk,
                &[Mutation::SetTtl { ttl: deadline }],
                Some(&condition),
                ItemType::Leader,
            )
            .map_err(|err| match err {
                TabulaError::ConditionFailed { .. } => TabulaError::condition_failed(pool),
                other => other,
            })?;
        Ok(deadline)
    }

    /// Report the current leader, or `None` when the pool is vacant.
    pub fn check(&self, pool: &str) -> TabulaResult<Option<LeaderLease>> {
        let pk = keys::leader_key(pool);
        let Some(item) = self.store.get(&pk, &pk)? else {
            return Ok(None);
        };
        let elected_at = item.metadata.get("elected_at").and_then(|v| v.as_u64());
        Ok(Some(LeaderLease {
            pool: pool.to_string(),
            leader: item.value.as_str().unwrap_or_default().to_string(),
            ttl: item.ttl,
            elected_at,
        }))
    }
}
