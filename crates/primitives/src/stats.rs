//! Key metadata and table inventory
//!
//! Read-only introspection over the single table: `key_info` describes one
//! partition (type, timestamps, type-specific detail) and `table_stats`
//! scans everything and groups it by primitive type. Neither filters
//! expired-but-unswept items, so counts reflect physical occupancy.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tabula_core::{Item, ItemType, TabulaError, TabulaResult};
use tabula_store::TableStore;

/// Type-specific detail attached to a [`KeyInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDetail {
    /// Counter: its current value.
    Counter {
        /// Current counter value.
        value: i64,
    },
    /// KV pair: size of the stored value in bytes.
    Kv {
        /// Length of the stored string value.
        value_size: usize,
    },
    /// List or queue: number of elements in the partition.
    Collection {
        /// Element count.
        item_count: usize,
    },
    /// Set: cardinality.
    Set {
        /// Member count.
        member_count: usize,
    },
    /// Lock: current holder.
    Lock {
        /// Owner identifier stored in the lock item.
        owner: String,
        /// Epoch seconds at acquisition, if recorded.
        acquired_at: Option<u64>,
    },
    /// Leader lease: current leader.
    Leader {
        /// Agent holding leadership.
        leader: String,
        /// Epoch seconds at election, if recorded.
        elected_at: Option<u64>,
    },
}

/// Metadata about a single stored key (one partition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    /// Full partition key, prefix included (e.g. `kv:session`).
    pub key: String,
    /// Primitive type of the partition.
    pub item_type: ItemType,
    /// Epoch seconds at creation.
    pub created_at: u64,
    /// Epoch seconds at last update.
    pub updated_at: u64,
    /// Absolute epoch-seconds expiry, if set.
    pub ttl: Option<u64>,
    /// Type-specific detail.
    pub detail: KeyDetail,
}

/// A counter listed in the table inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterEntry {
    /// Full partition key.
    pub key: String,
    /// Current value.
    pub value: i64,
}

/// A multi-item collection (list, set, or queue) in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionEntry {
    /// Full partition key.
    pub key: String,
    /// Number of items in the partition.
    pub size: usize,
}

/// A lock or leader lease in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderEntry {
    /// Full partition key.
    pub key: String,
    /// Owner (lock) or leader (lease) identifier.
    pub holder: String,
    /// Absolute epoch-seconds expiry, if set.
    pub ttl: Option<u64>,
}

/// Inventory of every primitive in the table, grouped by type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableStats {
    /// All counters with current values.
    pub counters: Vec<CounterEntry>,
    /// All lists with element counts.
    pub lists: Vec<CollectionEntry>,
    /// All sets with member counts.
    pub sets: Vec<CollectionEntry>,
    /// All queues with message counts.
    pub queues: Vec<CollectionEntry>,
    /// All held locks.
    pub locks: Vec<HolderEntry>,
    /// All leadership leases.
    pub leaders: Vec<HolderEntry>,
    /// Number of plain KV pairs.
    pub kv_pairs: usize,
    /// Total physical items scanned.
    pub total_items: usize,
}

/// Introspection facade.
#[derive(Clone)]
pub struct Stats {
    store: Arc<dyn TableStore>,
}

impl Stats {
    /// Create an introspection facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Describe one stored key. `key` is the full partition key, prefix
    /// included. Signals `KeyNotFound` for an empty partition.
    pub fn key_info(&self, key: &str) -> TabulaResult<KeyInfo> {
        let items = self.store.query(key, true, None)?;
        let Some(first) = items.first() else {
            return Err(TabulaError::key_not_found(key));
        };

        let detail = match first.item_type {
            ItemType::Counter => KeyDetail::Counter {
                value: first.value.as_int().unwrap_or(0),
            },
            ItemType::Kv => KeyDetail::Kv {
                value_size: first.value.as_str().map_or(0, str::len),
            },
            ItemType::List | ItemType::Queue => KeyDetail::Collection {
                item_count: items.len(),
            },
            ItemType::Set => KeyDetail::Set {
                member_count: items.len(),
            },
            ItemType::Lock => KeyDetail::Lock {
                owner: first.value.as_str().unwrap_or_default().to_string(),
                acquired_at: meta_u64(first, "acquired_at"),
            },
            ItemType::Leader => KeyDetail::Leader {
                leader: first.value.as_str().unwrap_or_default().to_string(),
                elected_at: meta_u64(first, "elected_at"),
            },
        };

        Ok(KeyInfo {
            key: key.to_string(),
            item_type: first.item_type,
            created_at: first.created_at,
            updated_at: first.updated_at,
            ttl: first.ttl,
            detail,
        })
    }

    /// Scan the whole table and group items by primitive type. Collections
    /// are listed once per partition with their item counts; entries come
    /// back in sort-key order within each group.
    pub fn table_stats(&self) -> TabulaResult<TableStats> {
        let items = self.store.scan("")?;

        let mut stats = TableStats {
            total_items: items.len(),
            ..TableStats::default()
        };
        let mut lists: BTreeMap<String, usize> = BTreeMap::new();
        let mut sets: BTreeMap<String, usize> = BTreeMap::new();
        let mut queues: BTreeMap<String, usize> = BTreeMap::new();

        for item in &items {
            match item.item_type {
                ItemType::Counter => stats.counters.push(CounterEntry {
                    key: item.pk.clone(),
                    value: item.value.as_int().unwrap_or(0),
                }),
                ItemType::Kv => stats.kv_pairs += 1,
                ItemType::List => *lists.entry(item.pk.clone()).or_default() += 1,
                ItemType::Set => *sets.entry(item.pk.clone()).or_default() += 1,
                ItemType::Queue => *queues.entry(item.pk.clone()).or_default() += 1,
                ItemType::Lock => stats.locks.push(HolderEntry {
                    key: item.pk.clone(),
                    holder: item.value.as_str().unwrap_or_default().to_string(),
                    ttl: item.ttl,
                }),
                ItemType::Leader => stats.leaders.push(HolderEntry {
                    key: item.pk.clone(),
                    holder: item.value.as_str().unwrap_or_default().to_string(),
                    ttl: item.ttl,
                }),
            }
        }

        stats.lists = collection_entries(lists);
        stats.sets = collection_entries(sets);
        stats.queues = collection_entries(queues);
        Ok(stats)
    }
}

fn collection_entries(grouped: BTreeMap<String, usize>) -> Vec<CollectionEntry> {
    grouped
        .into_iter()
        .map(|(key, size)| CollectionEntry { key, size })
        .collect()
}

fn meta_u64(item: &Item, key: &str) -> Option<u64> {
    item.metadata.get(key).and_then(|v| v.as_u64())
}
