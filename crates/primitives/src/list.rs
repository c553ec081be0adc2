//! List primitive (double-ended, order-preserving)
//!
//! Elements live under `list:{name}` with sort keys derived from a fixed
//! midpoint offset over a strictly increasing nanosecond clock: head
//! inserts encode `OFFSET - t_ns`, tail inserts `OFFSET + t_ns`. All head
//! keys sort below all tail keys, and within each side insertions are
//! correctly ordered, so ascending sort-key traversal reads the logical
//! list from head to tail regardless of which end elements entered from.
//!
//! Pops are two-step (query the extreme element, then delete it); two
//! concurrent pops can read the same element before either removes it.

use std::sync::Arc;
use tabula_core::{clock, Item, ItemType, TabulaResult, Value};
use tabula_store::TableStore;

use crate::keys;

/// Double-ended list facade.
#[derive(Clone)]
pub struct List {
    store: Arc<dyn TableStore>,
}

impl List {
    /// Create a list facade over a shared store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Insert at the head (before every existing element).
    pub fn push_head(&self, name: &str, value: &str) -> TabulaResult<()> {
        keys::validate_key(name)?;
        self.push(name, value, keys::list_head_sk(clock::now_nanos()))
    }

    /// Insert at the tail (after every existing element).
    pub fn push_tail(&self, name: &str, value: &str) -> TabulaResult<()> {
        keys::validate_key(name)?;
        self.push(name, value, keys::list_tail_sk(clock::now_nanos()))
    }

    fn push(&self, name: &str, value: &str, sk: String) -> TabulaResult<()> {
        let pk = keys::list_pk(name);
        let now = clock::now_seconds();
        let item = Item::new(&pk, &sk, ItemType::List, Value::from(value), now);
        self.store.put(item, None)
    }

    /// Elements from `start` (inclusive) to `stop` (exclusive), with
    /// sequence-slice semantics: negative indices count from the end and
    /// `stop` of `None` means to the end of the list.
    pub fn range(&self, name: &str, start: i64, stop: Option<i64>) -> TabulaResult<Vec<String>> {
        let pk = keys::list_pk(name);
        let items = self.store.query(&pk, true, None)?;
        let (begin, end) = slice_bounds(items.len(), start, stop);
        Ok(items[begin..end]
            .iter()
            .map(|item| item.value.as_str().unwrap_or_default().to_string())
            .collect())
    }

    /// Remove and return the head element, or `None` when empty.
    pub fn pop_head(&self, name: &str) -> TabulaResult<Option<String>> {
        self.pop_extreme(name, true)
    }

    /// Remove and return the tail element, or `None` when empty.
    pub fn pop_tail(&self, name: &str) -> TabulaResult<Option<String>> {
        self.pop_extreme(name, false)
    }

    fn pop_extreme(&self, name: &str, ascending: bool) -> TabulaResult<Option<String>> {
        let pk = keys::list_pk(name);
        let extreme = self.store.query(&pk, ascending, Some(1))?;
        let Some(item) = extreme.into_iter().next() else {
            return Ok(None);
        };
        self.store.delete(&pk, &item.sk, None)?;
        Ok(Some(item.value.as_str().unwrap_or_default().to_string()))
    }

    /// Number of elements.
    pub fn len(&self, name: &str) -> TabulaResult<usize> {
        self.store.count(&keys::list_pk(name))
    }

    /// True when the list has no elements.
    pub fn is_empty(&self, name: &str) -> TabulaResult<bool> {
        Ok(self.len(name)? == 0)
    }
}

/// Resolve slice indices the way a sequence slice does: `start` inclusive,
/// `stop` exclusive, negatives relative to the end, everything clamped.
fn slice_bounds(len: usize, start: i64, stop: Option<i64>) -> (usize, usize) {
    let len_i = len as i64;
    let resolve = |index: i64| -> usize {
        let resolved = if index < 0 { len_i + index } else { index };
        resolved.clamp(0, len_i) as usize
    };
    let begin = resolve(start);
    let end = stop.map_or(len, resolve);
    (begin, end.max(begin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_store::MemoryStore;

    fn setup() -> List {
        List::new(Arc::new(MemoryStore::new()))
    }

    fn abc() -> List {
        let list = setup();
        list.push_tail("l", "a").unwrap();
        list.push_tail("l", "b").unwrap();
        list.push_tail("l", "c").unwrap();
        list
    }

    #[test]
    fn tail_pushes_preserve_order() {
        let list = abc();
        assert_eq!(list.range("l", 0, None).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn head_pushes_prepend() {
        let list = setup();
        list.push_head("l", "b").unwrap();
        list.push_head("l", "a").unwrap();
        list.push_tail("l", "c").unwrap();
        assert_eq!(list.range("l", 0, None).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn mixed_ends_keep_logical_order() {
        let list = setup();
        list.push_tail("l", "middle").unwrap();
        list.push_head("l", "first").unwrap();
        list.push_tail("l", "last").unwrap();
        assert_eq!(
            list.range("l", 0, None).unwrap(),
            vec!["first", "middle", "last"]
        );
    }

    #[test]
    fn range_slice_semantics() {
        let list = abc();
        assert_eq!(list.range("l", 0, Some(2)).unwrap(), vec!["a", "b"]);
        assert_eq!(list.range("l", -2, None).unwrap(), vec!["b", "c"]);
        assert_eq!(list.range("l", 1, Some(-1)).unwrap(), vec!["b"]);
        assert_eq!(list.range("l", 2, Some(1)).unwrap(), Vec::<String>::new());
        assert_eq!(list.range("l", -10, Some(10)).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(list.range("l", 0, Some(0)).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn range_on_empty_list() {
        let list = setup();
        assert_eq!(list.range("empty", 0, None).unwrap(), Vec::<String>::new());
        assert_eq!(
            list.range("empty", -5, Some(5)).unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn pop_head_and_tail() {
        let list = abc();
        assert_eq!(list.pop_head("l").unwrap(), Some("a".to_string()));
        assert_eq!(list.pop_tail("l").unwrap(), Some("c".to_string()));
        assert_eq!(list.pop_head("l").unwrap(), Some("b".to_string()));
        assert_eq!(list.pop_head("l").unwrap(), None);
        assert_eq!(list.pop_tail("l").unwrap(), None);
    }

    #[test]
    fn len_tracks_pushes_and_pops() {
        let list = abc();
        assert_eq!(list.len("l").unwrap(), 3);
        list.pop_head("l").unwrap();
        assert_eq!(list.len("l").unwrap(), 2);
        assert!(!list.is_empty("l").unwrap());
        list.pop_tail("l").unwrap();
        list.pop_tail("l").unwrap();
        assert!(list.is_empty("l").unwrap());
    }

    mod slice_properties {
        use super::super::slice_bounds;
        use proptest::prelude::*;

        proptest! {
            /// slice_bounds must agree with a per-element membership oracle
            /// that never resolves or clamps indices: element i belongs to
            /// the slice iff it is at-or-after `start` and before `stop` in
            /// whichever representation (from the front, or negative from
            /// the back) the bound was given in.
            #[test]
            fn matches_membership_oracle(
                len in 0usize..32,
                start in -40i64..40,
                stop in proptest::option::of(-40i64..40),
            ) {
                let data: Vec<usize> = (0..len).collect();
                let (begin, end) = slice_bounds(len, start, stop);
                let ours = &data[begin..end];

                let len_i = len as i64;
                let expected: Vec<usize> = data
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(i, _)| {
                        let i = *i as i64;
                        let at_or_after_start = if start >= 0 {
                            i >= start
                        } else {
                            i - len_i >= start
                        };
                        let before_stop = match stop {
                            None => true,
                            Some(s) if s >= 0 => i < s,
                            Some(s) => i - len_i < s,
                        };
                        at_or_after_start && before_stop
                    })
                    .map(|(_, v)| v)
                    .collect();
                prop_assert_eq!(ours, &expected[..]);
            }
        }
    }
}
