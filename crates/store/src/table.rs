//! The `TableStore` contract
//!
//! One trait covers the full capability set the primitives need. The seven
//! primitives share no inheritance; each composes these calls directly
//! (capability-set polymorphism, not a class hierarchy).

use serde::{Deserialize, Serialize};
use tabula_core::{Item, ItemType, TabulaResult, Value};

/// Predicate evaluated against the current item state before a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The item must not exist.
    ///
    /// An expired-but-not-yet-swept item still counts as existing; TTL
    /// expiry is asynchronous and indistinguishable from held until swept.
    Absent,
    /// The item must exist.
    Exists,
    /// The item must exist and its value must equal the given value.
    ValueEquals(Value),
    /// The item is absent, or exists with the given value. Used by
    /// re-entrant lock acquisition (`absent OR owner == self`).
    AbsentOrValueEquals(Value),
}

/// A single field mutation applied by `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Atomic numeric ADD. Creates the item with value 0 + delta when the
    /// item is absent and no condition forbids creation. Guaranteed not to
    /// lose updates under concurrent callers. Saturates at the i64 bounds.
    Add {
        /// Signed amount to add.
        delta: i64,
    },
    /// Replace the value.
    SetValue {
        /// New payload.
        value: Value,
    },
    /// Replace the TTL deadline (absolute epoch seconds).
    SetTtl {
        /// New deadline.
        ttl: u64,
    },
}

/// One conditioned write inside an all-or-nothing transaction.
#[derive(Debug, Clone)]
pub enum TxnWrite {
    /// Insert or replace an item.
    Put {
        /// Full item to write.
        item: Item,
        /// Optional predicate on the current state.
        condition: Option<Condition>,
    },
    /// Mutate fields of an item (upserts when absent and unconditioned).
    Update {
        /// Partition key.
        pk: String,
        /// Sort key.
        sk: String,
        /// Mutations applied in order.
        mutations: Vec<Mutation>,
        /// Optional predicate on the current state.
        condition: Option<Condition>,
        /// Type stamped on the item if the update creates it.
        item_type: ItemType,
    },
    /// Remove an item.
    Delete {
        /// Partition key.
        pk: String,
        /// Sort key.
        sk: String,
        /// Optional predicate on the current state.
        condition: Option<Condition>,
    },
}

/// Ordered key-value table with conditional writes and coarse TTL expiry.
///
/// Implementations must guarantee:
/// - conditional failures surface as `TabulaError::ConditionFailed` carrying
///   the partition key, never as panics;
/// - `update` with `Mutation::Add` is atomic under concurrent callers;
/// - `query` returns items of one partition in sort-key order;
/// - `transact_write` applies every write or none.
pub trait TableStore: Send + Sync {
    /// Write a full item, optionally guarded by a condition.
    fn put(&self, item: Item, condition: Option<&Condition>) -> TabulaResult<()>;

    /// Point read. Expired-but-unswept items are still returned.
    fn get(&self, pk: &str, sk: &str) -> TabulaResult<Option<Item>>;

    /// Delete an item, optionally guarded by a condition. Returns the
    /// previous item when one existed. Unconditional deletes of absent
    /// items succeed and return `None`.
    fn delete(&self, pk: &str, sk: &str, condition: Option<&Condition>)
        -> TabulaResult<Option<Item>>;

    /// Apply mutations to an item and return the new state. When the item
    /// is absent and the condition permits, the update creates it with the
    /// given type (numeric ADD starts from zero).
    fn update(
        &self,
        pk: &str,
        sk: &str,
        mutations: &[Mutation],
        condition: Option<&Condition>,
        item_type: ItemType,
    ) -> TabulaResult<Item>;

    /// Range query over one partition key in sort-key order.
    fn query(&self, pk: &str, ascending: bool, limit: Option<usize>) -> TabulaResult<Vec<Item>>;

    /// Count items in a partition without reading payloads.
    fn count(&self, pk: &str) -> TabulaResult<usize>;

    /// Scan items whose partition key starts with `pk_prefix`, in
    /// (pk, sk) order. An empty prefix scans the whole table.
    fn scan(&self, pk_prefix: &str) -> TabulaResult<Vec<Item>>;

    /// Apply every write or none. Any failed condition aborts the batch
    /// with `ConditionFailed` before any write takes effect.
    fn transact_write(&self, writes: Vec<TxnWrite>) -> TabulaResult<()>;

    /// Remove items whose TTL deadline has passed. Best-effort background
    /// behavior surfaced as an explicit call; returns the number removed.
    fn sweep_expired(&self, now: u64) -> TabulaResult<usize>;
}
