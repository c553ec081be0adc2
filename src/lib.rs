//! Tabula: coordination primitives on a single ordered key-value table.
//!
//! Seven primitives (KV, counter, lock, leader election, priority queue,
//! set, double-ended list) plus an all-or-nothing transaction builder, all
//! expressed over one `TableStore` contract with conditional writes, atomic
//! numeric ADD, and coarse lazy TTL.
//!
//! ```
//! use tabula::{MemoryStore, Tabula};
//!
//! let db = Tabula::new(std::sync::Arc::new(MemoryStore::new()));
//! db.kv.set("greeting", "hello", None, false).unwrap();
//! assert_eq!(db.kv.get("greeting", None).unwrap(), "hello");
//!
//! db.counter.increment("hits", 1, true).unwrap();
//! assert_eq!(db.counter.read("hits").unwrap(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;

// ============================================================================
// Public API types
// ============================================================================

// Item model and errors
pub use tabula_core::{clock, constants, Item, ItemType, Metadata, TabulaError, TabulaResult, Value};

// Store contract and the in-memory implementation
pub use tabula_store::{Condition, MemoryStore, Mutation, TableStore, TxnWrite};

// Primitive facades and their result types
pub use tabula_primitives::{
    default_owner, CollectionEntry, Counter, CounterEntry, CounterOp, HolderEntry, KeyDetail,
    KeyInfo, Kv, Leader, LeaderLease, List, Lock, LockConfig, LockGrant, LockStatus,
    PoppedMessage, PushReceipt, Queue, QueuedMessage, ReleaseOutcome, Set, Stats, TableStats,
    Transaction, TxnAction, TxnBatch, TxnOp,
};

/// All primitives bundled over one shared store.
///
/// Each field is an independent stateless facade; cloning the bundle (or any
/// field) shares the underlying table.
#[derive(Clone)]
pub struct Tabula {
    /// Key-value pairs.
    pub kv: Kv,
    /// Atomic counters.
    pub counter: Counter,
    /// Distributed locks.
    pub lock: Lock,
    /// Leader election.
    pub leader: Leader,
    /// Priority/FIFO queues.
    pub queue: Queue,
    /// Sets.
    pub set: Set,
    /// Double-ended lists.
    pub list: List,
    /// All-or-nothing transactions.
    pub txn: Transaction,
    /// Key metadata and table inventory.
    pub stats: Stats,
}

impl Tabula {
    /// Bundle every primitive over the given store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            kv: Kv::new(store.clone()),
            counter: Counter::new(store.clone()),
            lock: Lock::new(store.clone()),
            leader: Leader::new(store.clone()),
            queue: Queue::new(store.clone()),
            set: Set::new(store.clone()),
            list: List::new(store.clone()),
            txn: Transaction::new(store.clone()),
            stats: Stats::new(store),
        }
    }

    /// Bundle with an explicit lock policy.
    pub fn with_lock_config(store: Arc<dyn TableStore>, config: LockConfig) -> Self {
        let mut db = Self::new(store.clone());
        db.lock = Lock::with_config(store, config);
        db
    }
}
