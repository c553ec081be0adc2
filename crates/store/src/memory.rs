//! In-memory `TableStore`
//!
//! Nested ordered maps (partition key -> sort key -> item) behind a single
//! mutex. Every operation takes the lock once, so conditional writes,
//! numeric ADDs, and multi-item transactions are linearizable exactly as the
//! contract requires.
//!
//! # Design
//!
//! - BTreeMap at both levels: partition scans and sort-key ranges fall out
//!   of the map ordering.
//! - TTL is swept only by `sweep_expired`. Reads never filter expired
//!   items, which models the asynchronous expiry of a real table: an item
//!   past its deadline still satisfies `Condition::Exists` until swept.
//! - `transact_write` validates every condition against the pre-transaction
//!   state and proves every numeric ADD applies cleanly (tracking the
//!   effects of earlier writes in the batch), then applies all writes under
//!   the same lock hold. The apply phase cannot fail, so a batch is always
//!   all-or-nothing.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tracing::{debug, trace};

use crate::table::{Condition, Mutation, TableStore, TxnWrite};

type Partition = BTreeMap<String, Item>;
type Table = BTreeMap<String, Partition>;

/// In-memory ordered key-value table.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(existing: Option<&Item>, condition: &Condition, pk: &str) -> TabulaResult<()> {
        let holds = match condition {
            Condition::Absent => existing.is_none(),
            Condition::Exists => existing.is_some(),
            Condition::ValueEquals(expected) => {
                matches!(existing, Some(item) if item.value == *expected)
            }
            Condition::AbsentOrValueEquals(expected) => match existing {
                None => true,
                Some(item) => item.value == *expected,
            },
        };
        if holds {
            Ok(())
        } else {
            Err(TabulaError::condition_failed(pk))
        }
    }

    fn apply_update(
        table: &mut Table,
        pk: &str,
        sk: &str,
        mutations: &[Mutation],
        item_type: ItemType,
    ) -> TabulaResult<Item> {
        let now = clock::now_seconds();
        let partition = table.entry(pk.to_string()).or_default();
        let item = partition.entry(sk.to_string()).or_insert_with(|| {
            Item::new(pk, sk, item_type, Value::Int(0), now)
        });

        for mutation in mutations {
            match mutation {
                Mutation::Add { delta } => {
                    let current = item.value.as_int().ok_or_else(|| {
                        TabulaError::invalid_input(format!(
                            "ADD requires a numeric value at '{pk}'"
                        ))
                    })?;
                    item.value = Value::Int(current.saturating_add(*delta));
                }
                Mutation::SetValue { value } => item.value = value.clone(),
                Mutation::SetTtl { ttl } => item.ttl = Some(*ttl),
            }
        }
        item.updated_at = now;
        Ok(item.clone())
    }
}

impl TableStore for MemoryStore {
    fn put(&self, item: Item, condition: Option<&Condition>) -> TabulaResult<()> {
        let mut table = self.table.lock();
        if let Some(condition) = condition {
            let existing = table.get(&item.pk).and_then(|p| p.get(&item.sk));
            Self::check(existing, condition, &item.pk)?;
        }
        trace!(pk = %item.pk, sk = %item.sk, "put");
        table
            .entry(item.pk.clone())
            .or_default()
            .insert(item.sk.clone(), item);
        Ok(())
    }

    fn get(&self, pk: &str, sk: &str) -> TabulaResult<Option<Item>> {
        let table = self.table.lock();
        Ok(table.get(pk).and_then(|p| p.get(sk)).cloned())
    }

    fn delete(
        &self,
        pk: &str,
        sk: &str,
        condition: Option<&Condition>,
    ) -> TabulaResult<Option<Item>> {
        let mut table = self.table.lock();
        if let Some(condition) = condition {
            let existing = table.get(pk).and_then(|p| p.get(sk));
            Self::check(existing, condition, pk)?;
        }
        let previous = table.get_mut(pk).and_then(|p| p.remove(sk));
        if table.get(pk).is_some_and(|p| p.is_empty()) {
            table.remove(pk);
        }
        Ok(previous)
    }

    fn update(
        &self,
        pk: &str,
        sk: &str,
        mutations: &[Mutation],
        condition: Option<&Condition>,
        item_type: ItemType,
    ) -> TabulaResult<Item> {
        let mut table = self.table.lock();
        if let Some(condition) = condition {
            let existing = table.get(pk).and_then(|p| p.get(sk));
            Self::check(existing, condition, pk)?;
        }
        Self::apply_update(&mut table, pk, sk, mutations, item_type)
    }

    fn query(&self, pk: &str, ascending: bool, limit: Option<usize>) -> TabulaResult<Vec<Item>> {
        let table = self.table.lock();
        let Some(partition) = table.get(pk) else {
            return Ok(Vec::new());
        };
        let take = limit.unwrap_or(usize::MAX);
        let items = if ascending {
            partition.values().take(take).cloned().collect()
        } else {
            partition.values().rev().take(take).cloned().collect()
        };
        Ok(items)
    }

    fn count(&self, pk: &str) -> TabulaResult<usize> {
        let table = self.table.lock();
        Ok(table.get(pk).map_or(0, |p| p.len()))
    }

    fn scan(&self, pk_prefix: &str) -> TabulaResult<Vec<Item>> {
        let table = self.table.lock();
        Ok(table
            .range(pk_prefix.to_string()..)
            .take_while(|(pk, _)| pk.starts_with(pk_prefix))
            .flat_map(|(_, partition)| partition.values().cloned())
            .collect())
    }

    fn transact_write(&self, writes: Vec<TxnWrite>) -> TabulaResult<()> {
        let mut table = self.table.lock();

        // Validate every write before touching the table: condition
        // predicates against the pre-transaction state, and that every
        // numeric ADD will land on an integer (or absent) item once the
        // earlier writes of the batch have applied. After this pass the
        // apply loop cannot fail, so a bad write can never leave earlier
        // writes of the batch behind.
        {
            let mut numeric_after: BTreeMap<(&str, &str), bool> = BTreeMap::new();
            for write in &writes {
                let (pk, sk, condition) = match write {
                    TxnWrite::Put { item, condition } => (&item.pk, &item.sk, condition),
                    TxnWrite::Update {
                        pk, sk, condition, ..
                    } => (pk, sk, condition),
                    TxnWrite::Delete { pk, sk, condition } => (pk, sk, condition),
                };
                let existing = table.get(pk.as_str()).and_then(|p| p.get(sk.as_str()));
                if let Some(condition) = condition {
                    Self::check(existing, condition, pk)?;
                }
                match write {
                    TxnWrite::Put { item, .. } => {
                        numeric_after
                            .insert((pk.as_str(), sk.as_str()), item.value.as_int().is_some());
                    }
                    TxnWrite::Update { mutations, .. } => {
                        for mutation in mutations {
                            match mutation {
                                Mutation::Add { .. } => {
                                    let addable = numeric_after
                                        .get(&(pk.as_str(), sk.as_str()))
                                        .copied()
                                        .unwrap_or_else(|| {
                                            existing
                                                .map_or(true, |item| item.value.as_int().is_some())
                                        });
                                    if !addable {
                                        return Err(TabulaError::invalid_input(format!(
                                            "ADD requires a numeric value at '{pk}'"
                                        )));
                                    }
                                    numeric_after.insert((pk.as_str(), sk.as_str()), true);
                                }
                                Mutation::SetValue { value } => {
                                    numeric_after.insert(
                                        (pk.as_str(), sk.as_str()),
                                        value.as_int().is_some(),
                                    );
                                }
                                Mutation::SetTtl { .. } => {}
                            }
                        }
                    }
                    TxnWrite::Delete { .. } => {
                        // Absent counts as addable (ADD creates from zero).
                        numeric_after.insert((pk.as_str(), sk.as_str()), true);
                    }
                }
            }
        }

        debug!(writes = writes.len(), "applying transaction");
        for write in writes {
            match write {
                TxnWrite::Put { item, .. } => {
                    table
                        .entry(item.pk.clone())
                        .or_default()
                        .insert(item.sk.clone(), item);
                }
                TxnWrite::Update {
                    pk,
                    sk,
                    mutations,
                    item_type,
                    ..
                } => {
                    Self::apply_update(&mut table, &pk, &sk, &mutations, item_type)?;
                }
                TxnWrite::Delete { pk, sk, .. } => {
                    if let Some(partition) = table.get_mut(&pk) {
                        partition.remove(&sk);
                        if partition.is_empty() {
                            table.remove(&pk);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn sweep_expired(&self, now: u64) -> TabulaResult<usize> {
        let mut table = self.table.lock();
        let mut removed = 0;
        table.retain(|_, partition| {
            partition.retain(|_, item| {
                let keep = !item.is_expired(now);
                if !keep {
                    removed += 1;
                }
                keep
            });
            !partition.is_empty()
        });
        if removed > 0 {
            debug!(removed, "ttl sweep");
        }
        Ok(removed)
    }
}
