//! Single-table item model
//!
//! Every entity lives in one table keyed by (partition key, sort key), both
//! strings. Items additionally carry a `type` discriminator, created/updated
//! timestamps in epoch seconds, an optional absolute-epoch `ttl`, and a
//! value/metadata payload.
//!
//! TTL is advisory: an item past its deadline may still be physically
//! present until the store's background sweep removes it. `is_expired`
//! models that distinction explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type discriminator stored on every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Opaque key-value pair.
    Kv,
    /// Integer counter mutated only via atomic ADD.
    Counter,
    /// Mutual-exclusion lease.
    Lock,
    /// Priority/FIFO queue message.
    Queue,
    /// Leadership lease.
    Leader,
    /// Set member.
    Set,
    /// Double-ended list element.
    List,
}

impl ItemType {
    /// Lowercase name as stored in the `type` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Kv => "kv",
            ItemType::Counter => "counter",
            ItemType::Lock => "lock",
            ItemType::Queue => "queue",
            ItemType::Leader => "leader",
            ItemType::Set => "set",
            ItemType::List => "list",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item payload.
///
/// KV, lock, leader, queue, set, and list items store strings; counters
/// store integers so the store can apply atomic numeric ADD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Opaque string payload.
    Str(String),
    /// Integer payload (counters).
    Int(i64),
}

impl Value {
    /// String view of the payload, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Integer view of the payload, if it is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Free-form metadata attached to an item (elected_at, priority, dedup id, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One row of the single table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Partition key, e.g. `lock:deploy` or `queue:tasks`.
    pub pk: String,
    /// Sort key. Equals the PK for single-item entities; orders messages,
    /// members, and elements within collection partitions.
    pub sk: String,
    /// Primitive type discriminator.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Payload.
    pub value: Value,
    /// Side-channel attributes (acquired_at, priority, dedup_id, ...).
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Absolute epoch-seconds deadline after which the store may delete the
    /// item. Expiry is asynchronous, not instantaneous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// Epoch seconds at creation.
    pub created_at: u64,
    /// Epoch seconds at last mutation.
    pub updated_at: u64,
}

impl Item {
    /// Build an item with both timestamps set to `now`.
    pub fn new(
        pk: impl Into<String>,
        sk: impl Into<String>,
        item_type: ItemType,
        value: Value,
        now: u64,
    ) -> Self {
        Item {
            pk: pk.into(),
            sk: sk.into(),
            item_type,
            value,
            metadata: Metadata::new(),
            ttl: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set an absolute TTL deadline.
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Attach a metadata attribute.
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// True when the item carries a TTL that has passed.
    ///
    /// An expired item may still be physically present; callers relying on
    /// TTL for liveness must check this rather than trusting absence.
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.ttl, Some(deadline) if deadline <= now)
    }
}
