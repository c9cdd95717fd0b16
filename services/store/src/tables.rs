//! Natural-key tables with idempotent insertion
//!
//! A `Table` maps natural keys to rows using a `BTreeMap` so iteration is
//! deterministic. Re-inserting a known key is never an error: the existing
//! row is left untouched and the caller learns the row was already present.

use std::collections::BTreeMap;

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was new; the row is now stored.
    Inserted,
    /// The key was already stored; existing attributes were left unchanged.
    AlreadyPresent,
}

impl PutOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, PutOutcome::Inserted)
    }
}

/// Append-only keyed table. Rows are created once and never deleted.
#[derive(Debug)]
pub struct Table<K: Ord, R> {
    rows: BTreeMap<K, R>,
}

impl<K: Ord, R> Default for Table<K, R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, R> Table<K, R> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Idempotent insert: a duplicate key is a no-op, never a failure.
    pub fn put(&mut self, key: K, row: R) -> PutOutcome {
        match self.rows.entry(key) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(row);
                PutOutcome::Inserted
            }
            std::collections::btree_map::Entry::Occupied(_) => PutOutcome::AlreadyPresent,
        }
    }

    pub fn get(&self, key: &K) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &R)> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_duplicate() {
        let mut table: Table<u64, &str> = Table::new();
        assert_eq!(table.put(1, "first"), PutOutcome::Inserted);
        assert_eq!(table.put(1, "second"), PutOutcome::AlreadyPresent);
        // The original attributes survive a duplicate put.
        assert_eq!(table.get(&1), Some(&"first"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut table: Table<u64, ()> = Table::new();
        table.put(3, ());
        table.put(1, ());
        table.put(2, ());
        let keys: Vec<u64> = table.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }
}
