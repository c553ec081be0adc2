//! Primitive protocols for tabula
//!
//! This crate implements the seven coordination primitives plus the
//! transaction builder, each as an independent module over the shared
//! `TableStore` contract:
//! - KV: opaque string values with optional TTL and create-if-absent
//! - Counter: integers mutated only via atomic ADD
//! - Lock: mutual exclusion with lease, bounded-wait acquire
//! - Leader: single-winner election with heartbeat renewal
//! - Queue: priority + FIFO messages with receipts and visibility timeout
//! - Set: membership by sort-key existence
//! - List: double-ended, order-preserving elements
//! - Transaction: all-or-nothing batches over KV/Counter/Lock/Leader
//!
//! All primitives are stateless facades: each holds only an
//! `Arc<dyn TableStore>`, so clones sharing a store see the same data and
//! all mutual exclusion is expressed as store-level conditions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod counter;
pub mod keys;
pub mod kv;
pub mod leader;
pub mod list;
pub mod lock;
pub mod queue;
pub mod set;
pub mod stats;
pub mod txn;

pub use counter::Counter;
pub use kv::Kv;
pub use leader::{Leader, LeaderLease};
pub use list::List;
pub use lock::{default_owner, Lock, LockConfig, LockGrant, LockStatus, ReleaseOutcome};
pub use queue::{PoppedMessage, PushReceipt, Queue, QueuedMessage};
pub use set::Set;
pub use stats::{CollectionEntry, CounterEntry, HolderEntry, KeyDetail, KeyInfo, Stats, TableStats};
pub use txn::{CounterOp, Transaction, TxnAction, TxnBatch, TxnOp};
