//! Queue primitive (priority + FIFO)
//!
//! Messages live under `queue:{name}` with sort key
//! `{priority:010}#{micros:016}#{uuid}`: ascending sort-key order is
//! delivery order - lower numeric priority first, FIFO within a priority,
//! uuid tie-break for same-microsecond insertions.
//!
//! # Known non-atomicity
//!
//! - The dedup pre-check is a bounded scan followed by an unconditional
//!   put, not a single conditional write: two concurrent pushes with the
//!   same dedup id can both land. A true guard would be a conditional put
//!   keyed by the dedup id itself.
//! - Pop is a two-step sequence (query head, then delete or hide); two
//!   concurrent pops can read the same head before either removes it.

use serde::Serialize;
use std::sync::Arc;
use tabula_core::constants::{QUEUE_DEDUP_WINDOW, QUEUE_PEEK_COUNT};
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tabula_store::{Mutation, TableStore};
use tracing::debug;
use uuid::Uuid;

use crate::keys;

/// Receipt returned by a push. `receipt` is the message's full sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReceipt {
    /// Queue name.
    pub queue: String,
    /// Full sort key of the stored message.
    pub receipt: String,
    /// Priority the message was stored with.
    pub priority: u64,
    /// Tie-break identifier.
    pub message_uuid: String,
    /// Dedup id, when one was supplied.
    pub dedup_id: Option<String>,
}

/// A message removed (or hidden) by a pop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoppedMessage {
    /// Queue name.
    pub queue: String,
    /// Message payload.
    pub message: String,
    /// Full sort key; pass to `ack` to acknowledge.
    pub receipt: String,
    /// Message priority.
    pub priority: u64,
    /// Insertion time in epoch microseconds.
    pub enqueued_micros: u64,
}

/// A message observed by a peek. Read-only: no receipt is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedMessage {
    /// Message payload.
    pub message: String,
    /// Message priority.
    pub priority: u64,
    /// Insertion time in epoch microseconds.
    pub enqueued_micros: u64,
}

/// Priority/FIFO queue facade.
#[derive(Clone)]
pub struct Queue {
    store: Arc<dyn TableStore>,
}

impl Queue {
    /// Create a queue facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Push a message. Lower `priority` means more urgent. `ttl` is seconds
    /// from now. With `dedup_id`, a best-effort scan over the most recent
    /// window rejects duplicates with `AlreadyExists` (see module docs for
    /// the race this leaves open).
    pub fn push(
        &self,
        name: &str,
        data: &str,
        priority: u64,
        dedup_id: Option<&str>,
        ttl: Option<u64>,
    ) -> TabulaResult<PushReceipt> {
        keys::validate_key(name)?;
        keys::validate_priority(priority)?;
        let pk = keys::queue_pk(name);

        if let Some(dedup) = dedup_id {
            let window = self.store.query(&pk, true, Some(QUEUE_DEDUP_WINDOW))?;
            let duplicate = window.iter().any(|item| {
                item.metadata.get("dedup_id").and_then(|v| v.as_str()) == Some(dedup)
            });
            if duplicate {
                return Err(TabulaError::already_exists(format!(
                    "{name}/dedup:{dedup}"
                )));
            }
        }

        let micros = clock::now_micros();
        let now = clock::now_seconds();
        let message_uuid = Uuid::new_v4().to_string();
        let sk = keys::queue_sort_key(priority, micros, &message_uuid);

        let mut item = Item::new(&pk, &sk, ItemType::Queue, Value::from(data), now)
            .with_meta("priority", priority)
            .with_meta("timestamp_micros", micros)
            .with_meta("message_uuid", message_uuid.clone());
        if let Some(dedup) = dedup_id {
            item = item.with_meta("dedup_id", dedup);
        }
        if let Some(ttl) = ttl {
            item = item.with_ttl(now.saturating_add(ttl));
        }

        self.store.put(item, None)?;
        debug!(queue = name, priority, "pushed message");
        Ok(PushReceipt {
            queue: name.to_string(),
            receipt: sk,
            priority,
            message_uuid,
            dedup_id: dedup_id.map(str::to_string),
        })
    }

    /// Pop the most urgent (then oldest) message.
    ///
    /// With `visibility_timeout` of zero the message is deleted
    /// permanently. Otherwise its TTL is set to now + timeout as a
    /// temporary hide: the item stays in place and reappears to consumers
    /// if not acknowledged before the store sweeps it. Returns `None` when
    /// the queue is empty. Never retries.
    pub fn pop(&self, name: &str, visibility_timeout: u64) -> TabulaResult<Option<PoppedMessage>> {
        let pk = keys::queue_pk(name);
        let head = self.store.query(&pk, true, Some(1))?;
        let Some(item) = head.into_iter().next() else {
            return Ok(None);
        };

        if visibility_timeout == 0 {
            self.store.delete(&pk, &item.sk, None)?;
        } else {
            let deadline = clock::now_seconds().saturating_add(visibility_timeout);
            self.store.update(
                &pk,
                &item.sk,
                &[Mutation::SetTtl { ttl: deadline }],
                None,
                ItemType::Queue,
            )?;
        }

        Ok(Some(PoppedMessage {
            queue: name.to_string(),
            message: item.value.as_str().unwrap_or_default().to_string(),
            receipt: item.sk.clone(),
            priority: meta_u64(&item, "priority"),
            enqueued_micros: meta_u64(&item, "timestamp_micros"),
        }))
    }

    /// Acknowledge (delete) a message by receipt. Idempotent: an absent
    /// receipt (already acknowledged, expired, or bogus) is success.
    pub fn ack(&self, name: &str, receipt: &str) -> TabulaResult<()> {
        let pk = keys::queue_pk(name);
        self.store.delete(&pk, receipt, None)?;
        Ok(())
    }

    /// Inspect up to `count` head messages without mutating anything.
    pub fn peek(&self, name: &str, count: Option<usize>) -> TabulaResult<Vec<QueuedMessage>> {
        let pk = keys::queue_pk(name);
        let items = self
            .store
            .query(&pk, true, Some(count.unwrap_or(QUEUE_PEEK_COUNT)))?;
        Ok(items
            .into_iter()
            .map(|item| QueuedMessage {
                message: item.value.as_str().unwrap_or_default().to_string(),
                priority: meta_u64(&item, "priority"),
                enqueued_micros: meta_u64(&item, "timestamp_micros"),
            })
            .collect())
    }

    /// Number of messages in the queue (count-only query).
    pub fn size(&self, name: &str) -> TabulaResult<usize> {
        self.store.count(&keys::queue_pk(name))
    }
}

fn meta_u64(item: &Item, key: &str) -> u64 {
    item.metadata.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}
