//! Backing store layer for tabula
//!
//! Abstracts an ordered key-value table offering point get/put/delete with
//! optional conditions, atomic numeric ADD, range query by partition key,
//! count-only query, all-or-nothing multi-item writes, and best-effort TTL
//! expiry.
//!
//! # Design
//!
//! Conditional writes are the sole atomicity primitive: every conditional
//! operation fails with `ConditionFailed` (not a crash) when its predicate
//! does not hold. The primitive protocols never hold client-side locks; the
//! store is the only synchronization point.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod table;

pub use memory::MemoryStore;
pub use table::{Condition, Mutation, TableStore, TxnWrite};
