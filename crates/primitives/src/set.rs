//! Set primitive
//!
//! Membership is the existence of the exact sort key `set:{name}#{member}`
//! under partition `set:{name}`. Membership tests and cardinality never
//! read item payloads: `is_member` is a point get on the composite key and
//! `size` is a count-only query.

use std::sync::Arc;
use tabula_core::{clock, Item, ItemType, TabulaResult, Value};
use tabula_store::TableStore;

use crate::keys;

/// Set facade.
#[derive(Clone)]
pub struct Set {
    store: Arc<dyn TableStore>,
}

impl Set {
    /// Create a set facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Add a member. Idempotent: overwriting an existing member is a no-op
    /// in effect.
    pub fn add(&self, name: &str, member: &str) -> TabulaResult<()> {
        keys::validate_set_name(name)?;
        let pk = keys::set_pk(name);
        let sk = keys::set_sk(name, member);
        let now = clock::now_seconds();
        let item = Item::new(&pk, &sk, ItemType::Set, Value::from(member), now);
        self.store.put(item, None)
    }

    /// Remove a member. Idempotent: removing an absent member succeeds.
    pub fn remove(&self, name: &str, member: &str) -> TabulaResult<()> {
        let pk = keys::set_pk(name);
        let sk = keys::set_sk(name, member);
        self.store.delete(&pk, &sk, None)?;
        Ok(())
    }

    /// Membership test: point get on the exact composite key.
    pub fn is_member(&self, name: &str, member: &str) -> TabulaResult<bool> {
        let pk = keys::set_pk(name);
        let sk = keys::set_sk(name, member);
        Ok(self.store.get(&pk, &sk)?.is_some())
    }

    /// All members, extracted from the sort keys of a partition query.
    pub fn members(&self, name: &str) -> TabulaResult<Vec<String>> {
        let pk = keys::set_pk(name);
        let items = self.store.query(&pk, true, None)?;
        Ok(items
            .iter()
            .filter_map(|item| keys::parse_set_member(&item.sk))
            .map(str::to_string)
            .collect())
    }

    /// Cardinality via a count-only query.
    pub fn size(&self, name: &str) -> TabulaResult<usize> {
        self.store.count(&keys::set_pk(name))
    }
}
