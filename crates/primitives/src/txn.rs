//! Transaction builder (all-or-nothing batches)
//!
//! A batch is a list of Put/Update/Delete operations over KV, counter,
//! lock, and leader keys, executed through the store's `transact_write`:
//! every condition is checked against the pre-transaction state and either
//! every write applies or none does. Queue, set, and list partitions hold
//! multiple sort keys per name, so they are rejected up front.
//!
//! Batches deserialize from JSON of the shape
//! `{"operations": [{"action": "Put", "type": "kv", "key": ..., ...}]}`.

use serde::Deserialize;
use std::sync::Arc;
use tabula_core::constants::MAX_TRANSACTION_OPS;
use tabula_core::{clock, Item, ItemType, TabulaError, TabulaResult, Value};
use tabula_store::{Condition, Mutation, TableStore, TxnWrite};
use tracing::debug;

use crate::keys;

/// Action performed by one transaction operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TxnAction {
    /// Write a full item.
    Put,
    /// Mutate an existing (or, for counters, implicit) item in place.
    Update,
    /// Remove an item.
    Delete,
}

/// Counter direction for an Update on a counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterOp {
    /// Add the operand (default 1).
    Inc,
    /// Subtract the operand (default 1).
    Dec,
}

/// One operation in a transaction batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxnOp {
    /// Put, Update, or Delete.
    pub action: TxnAction,
    /// Primitive type; determines the key prefix.
    #[serde(rename = "type")]
    pub op_type: ItemType,
    /// Bare key name (no prefix).
    pub key: String,
    /// Payload for Put, new value for Update, operand for counter ops.
    #[serde(default)]
    pub value: Option<Value>,
    /// Optional store-level condition checked against pre-state.
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Counter direction; only meaningful for Update on a counter.
    #[serde(default)]
    pub operation: Option<CounterOp>,
}

/// A parsed transaction batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxnBatch {
    /// Operations in application order.
    pub operations: Vec<TxnOp>,
}

impl TxnBatch {
    /// Wrap a list of operations.
    pub fn new(operations: Vec<TxnOp>) -> Self {
        Self { operations }
    }

    /// Parse a batch from its JSON document form.
    pub fn from_json_str(json: &str) -> TabulaResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| TabulaError::invalid_input(format!("invalid transaction JSON: {err}")))
    }
}

/// Transaction facade.
#[derive(Clone)]
pub struct Transaction {
    store: Arc<dyn TableStore>,
}

impl Transaction {
    /// Create a transaction facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Execute a batch atomically. Returns the number of operations
    /// applied. The whole batch is validated and translated before the
    /// store is touched, so a malformed operation can never leave a
    /// partial write behind.
    pub fn execute(&self, batch: &TxnBatch) -> TabulaResult<usize> {
        if batch.operations.is_empty() {
            return Err(TabulaError::invalid_input(
                "transaction requires at least one operation",
            ));
        }
        if batch.operations.len() > MAX_TRANSACTION_OPS {
            return Err(TabulaError::invalid_input(format!(
                "transaction cannot exceed {MAX_TRANSACTION_OPS} operations"
            )));
        }

        let now = clock::now_seconds();
        let writes = batch
            .operations
            .iter()
            .enumerate()
            .map(|(idx, op)| {
                build_write(op, now).map_err(|err| {
                    TabulaError::invalid_input(format!("operation {idx}: {err}"))
                })
            })
            .collect::<TabulaResult<Vec<_>>>()?;

        let count = writes.len();
        self.store.transact_write(writes)?;
        debug!(operations = count, "transaction committed");
        Ok(count)
    }
}

fn build_write(op: &TxnOp, now: u64) -> TabulaResult<TxnWrite> {
    keys::validate_key(&op.key)?;
    let pk = single_item_key(op.op_type, &op.key)?;

    match op.action {
        TxnAction::Put => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| TabulaError::invalid_input("Put requires 'value'"))?;
            if op.op_type == ItemType::Counter && value.as_int().is_none() {
                return Err(TabulaError::invalid_input(
                    "counter value must be an integer",
                ));
            }
            let item = Item::new(&pk, &pk, op.op_type, value, now);
            Ok(TxnWrite::Put {
                item,
                condition: op.condition.clone(),
            })
        }
        TxnAction::Update => {
            let mutation = if op.op_type == ItemType::Counter && op.operation.is_some() {
                let operand = match &op.value {
                    None => 1,
                    Some(Value::Int(n)) => *n,
                    Some(Value::Str(_)) => {
                        return Err(TabulaError::invalid_input(
                            "counter operand must be an integer",
                        ))
                    }
                };
                let delta = match op.operation {
                    Some(CounterOp::Dec) => -operand.abs(),
                    _ => operand,
                };
                Mutation::Add { delta }
            } else {
                let value = op
                    .value
                    .clone()
                    .ok_or_else(|| TabulaError::invalid_input("Update requires 'value'"))?;
                Mutation::SetValue { value }
            };
            Ok(TxnWrite::Update {
                pk: pk.clone(),
                sk: pk,
                mutations: vec![mutation],
                condition: op.condition.clone(),
                item_type: op.op_type,
            })
        }
        TxnAction::Delete => Ok(TxnWrite::Delete {
            pk: pk.clone(),
            sk: pk,
            condition: op.condition.clone(),
        }),
    }
}

/// Keys for the single-item primitives. Queue, set, and list names map to
/// whole partitions, not one sort key, and cannot be addressed here.
fn single_item_key(op_type: ItemType, key: &str) -> TabulaResult<String> {
    match op_type {
        ItemType::Kv => Ok(keys::kv_key(key)),
        ItemType::Counter => Ok(keys::counter_key(key)),
        ItemType::Lock => Ok(keys::lock_key(key)),
        ItemType::Leader => Ok(keys::leader_key(key)),
        ItemType::Queue | ItemType::Set | ItemType::List => Err(TabulaError::invalid_input(
            format!("type '{op_type}' not supported in transactions"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Counter, Kv};
    use tabula_store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Transaction) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Transaction::new(store))
    }

    fn put(op_type: ItemType, key: &str, value: &str) -> TxnOp {
        TxnOp {
            action: TxnAction::Put,
            op_type,
            key: key.to_string(),
            value: Some(Value::from(value)),
            condition: None,
            operation: None,
        }
    }

    #[test]
    fn empty_batch_is_invalid() {
        let (_store, txn) = setup();
        let err = txn.execute(&TxnBatch::new(Vec::new())).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));
    }

    #[test]
    fn oversized_batch_is_invalid() {
        let (_store, txn) = setup();
        let ops = (0..=MAX_TRANSACTION_OPS)
            .map(|i| put(ItemType::Kv, &format!("k{i}"), "v"))
            .collect();
        let err = txn.execute(&TxnBatch::new(ops)).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));
    }

    #[test]
    fn collection_types_are_rejected() {
        let (store, txn) = setup();
        for op_type in [ItemType::Queue, ItemType::Set, ItemType::List] {
            let err = txn
                .execute(&TxnBatch::new(vec![put(op_type, "name", "v")]))
                .unwrap_err();
            assert!(matches!(err, TabulaError::InvalidInput(_)));
        }
        assert!(store.scan("").unwrap().is_empty());
    }

    #[test]
    fn put_without_value_is_invalid() {
        let (_store, txn) = setup();
        let op = TxnOp {
            action: TxnAction::Put,
            op_type: ItemType::Kv,
            key: "k".to_string(),
            value: None,
            condition: None,
            operation: None,
        };
        let err = txn.execute(&TxnBatch::new(vec![op])).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));
    }

    #[test]
    fn mixed_batch_applies_every_write() {
        let (store, txn) = setup();
        let kv = Kv::new(store.clone());
        let counter = Counter::new(store.clone());
        counter.increment("hits", 5, true).unwrap();

        let inc = TxnOp {
            action: TxnAction::Update,
            op_type: ItemType::Counter,
            key: "hits".to_string(),
            value: Some(Value::Int(3)),
            condition: None,
            operation: Some(CounterOp::Inc),
        };
        let applied = txn
            .execute(&TxnBatch::new(vec![put(ItemType::Kv, "state", "ready"), inc]))
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(kv.get("state", None).unwrap(), "ready");
        assert_eq!(counter.read("hits").unwrap(), 8);
    }

    #[test]
    fn failed_condition_rolls_back_everything() {
        let (store, txn) = setup();
        let kv = Kv::new(store.clone());
        kv.set("existing", "old", None, false).unwrap();

        let mut guarded = put(ItemType::Kv, "existing", "new");
        guarded.condition = Some(Condition::Absent);
        let batch = TxnBatch::new(vec![put(ItemType::Kv, "fresh", "v"), guarded]);

        let err = txn.execute(&batch).unwrap_err();
        assert!(err.is_condition_failed());
        // Neither write landed.
        assert!(!kv.exists("fresh").unwrap());
        assert_eq!(kv.get("existing", None).unwrap(), "old");
    }

    #[test]
    fn counter_put_requires_integer_value() {
        let (store, txn) = setup();
        let err = txn
            .execute(&TxnBatch::new(vec![put(ItemType::Counter, "hits", "ten")]))
            .unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));
        assert!(store.scan("").unwrap().is_empty());
    }

    #[test]
    fn counter_update_on_corrupt_value_voids_the_batch() {
        let (store, txn) = setup();
        // A counter partition holding a string, written out-of-band.
        store
            .put(
                Item::new("counter:c", "counter:c", ItemType::Counter, Value::from("s"), 1),
                None,
            )
            .unwrap();

        let inc = TxnOp {
            action: TxnAction::Update,
            op_type: ItemType::Counter,
            key: "c".to_string(),
            value: None,
            condition: None,
            operation: Some(CounterOp::Inc),
        };
        let batch = TxnBatch::new(vec![put(ItemType::Kv, "flag", "set"), inc]);
        let err = txn.execute(&batch).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));

        // The unconditional put earlier in the batch must not have landed.
        assert!(!Kv::new(store.clone()).exists("flag").unwrap());
    }

    #[test]
    fn counter_dec_negates_the_operand() {
        let (store, txn) = setup();
        let counter = Counter::new(store.clone());
        counter.increment("stock", 10, true).unwrap();

        let dec = TxnOp {
            action: TxnAction::Update,
            op_type: ItemType::Counter,
            key: "stock".to_string(),
            value: Some(Value::Int(4)),
            condition: None,
            operation: Some(CounterOp::Dec),
        };
        txn.execute(&TxnBatch::new(vec![dec])).unwrap();
        assert_eq!(counter.read("stock").unwrap(), 6);
    }

    #[test]
    fn counter_operand_defaults_to_one() {
        let (store, txn) = setup();
        let counter = Counter::new(store.clone());

        let inc = TxnOp {
            action: TxnAction::Update,
            op_type: ItemType::Counter,
            key: "fresh".to_string(),
            value: None,
            condition: None,
            operation: Some(CounterOp::Inc),
        };
        txn.execute(&TxnBatch::new(vec![inc])).unwrap();
        // Counter updates in a transaction create the item when absent.
        assert_eq!(counter.read("fresh").unwrap(), 1);
    }

    #[test]
    fn delete_with_condition() {
        let (store, txn) = setup();
        let kv = Kv::new(store.clone());
        kv.set("k", "expected", None, false).unwrap();

        let del = TxnOp {
            action: TxnAction::Delete,
            op_type: ItemType::Kv,
            key: "k".to_string(),
            value: None,
            condition: Some(Condition::ValueEquals(Value::from("expected"))),
            operation: None,
        };
        txn.execute(&TxnBatch::new(vec![del])).unwrap();
        assert!(!kv.exists("k").unwrap());
    }

    #[test]
    fn batch_parses_from_json() {
        let json = r#"{
            "operations": [
                {"action": "Put", "type": "kv", "key": "cfg", "value": "on", "condition": "absent"},
                {"action": "Update", "type": "counter", "key": "hits", "value": 2, "operation": "inc"},
                {"action": "Delete", "type": "lock", "key": "deploy"}
            ]
        }"#;
        let batch = TxnBatch::from_json_str(json).unwrap();
        assert_eq!(batch.operations.len(), 3);
        assert_eq!(batch.operations[0].condition, Some(Condition::Absent));
        assert_eq!(batch.operations[1].operation, Some(CounterOp::Inc));
        assert_eq!(batch.operations[1].value, Some(Value::Int(2)));
        assert_eq!(batch.operations[2].action, TxnAction::Delete);

        let (store, txn) = setup();
        txn.execute(&batch).unwrap();
        assert_eq!(Kv::new(store.clone()).get("cfg", None).unwrap(), "on");
        assert_eq!(Counter::new(store).read("hits").unwrap(), 2);
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = TxnBatch::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));

        let err = TxnBatch::from_json_str(r#"{"operations": "nope"}"#).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidInput(_)));
    }
}
