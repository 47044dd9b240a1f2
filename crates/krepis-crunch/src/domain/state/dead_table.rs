//! Dead-State Table
//!
//! Permanent record of retired states. Consulted on every must-explore
//! decision and mutated only when a live table is folded in or when a
//! deeper re-exploration evicts an entry.
//!
//! A single coarse `RwLock` guards the map. Lookups take the read side; every
//! mutation takes the write side exactly once.

use super::types::{DeadState, StateKey};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Set of permanently retired states keyed by `(fingerprint, magic_bit)`
#[derive(Debug, Default)]
pub struct DeadStateTable {
    states: RwLock<HashMap<StateKey, DeadState>>,
}

impl DeadStateTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, overwriting any earlier record of the same key
    pub fn insert(&self, state: DeadState) {
        self.states.write().insert(state.key(), state);
    }

    /// Whether a record exists under `key`
    pub fn contains(&self, key: StateKey) -> bool {
        self.states.read().contains_key(&key)
    }

    /// Copy of the record under `key`
    pub fn lookup(&self, key: StateKey) -> Option<DeadState> {
        self.states.read().get(&key).copied()
    }

    /// Remove and return the record under `key`
    pub fn remove(&self, key: StateKey) -> Option<DeadState> {
        self.states.write().remove(&key)
    }

    /// Number of records (both liveness phases)
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    /// Number of distinct fingerprints retired during ordinary visitation
    pub fn distinct_states(&self) -> usize {
        self.states.read().keys().filter(|key| !key.magic_bit).count()
    }

    /// All records, sorted by key
    pub fn snapshot(&self) -> Vec<DeadState> {
        let mut records: Vec<DeadState> = self.states.read().values().copied().collect();
        records.sort_by_key(DeadState::key);
        records
    }

    /// Insert a batch of records under one write lock
    pub(crate) fn absorb<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = DeadState>,
    {
        let mut states = self.states.write();
        let mut count = 0;
        for record in records {
            states.insert(record.key(), record);
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::types::Fingerprint;

    fn fp(raw: u64) -> Fingerprint {
        Fingerprint::new(raw)
    }

    #[test]
    fn test_insert_and_lookup() {
        let table = DeadStateTable::new();
        table.insert(DeadState::new(fp(1), 0, false));

        let found = table.lookup(StateKey::plain(fp(1))).expect("record present");
        assert!(found.is_fully_explored());
        assert!(table.lookup(StateKey::new(fp(1), true)).is_none());
    }

    #[test]
    fn test_insert_overwrites_depth() {
        let table = DeadStateTable::new();
        table.insert(DeadState::new(fp(9), 0, false));
        table.insert(DeadState::new(fp(9), 3, false));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup(StateKey::plain(fp(9))).map(|s| s.explore_if_depth_lower_than),
            Some(3)
        );
    }

    #[test]
    fn test_distinct_states_ignores_magic_copies() {
        let table = DeadStateTable::new();
        table.insert(DeadState::new(fp(1), 0, false));
        table.insert(DeadState::new(fp(1), 0, true));
        table.insert(DeadState::new(fp(2), 0, false));

        assert_eq!(table.len(), 3);
        assert_eq!(table.distinct_states(), 2);
        assert!(table.contains(StateKey::new(fp(1), true)));
        assert!(!table.contains(StateKey::plain(fp(3))));
    }

    #[test]
    fn test_absorb_overwrites() {
        let table = DeadStateTable::new();
        table.insert(DeadState::new(fp(1), 5, false));

        let added = table.absorb(vec![DeadState::new(fp(1), 0, false), DeadState::new(fp(2), 2, false)]);
        assert_eq!(added, 2);
        assert_eq!(table.len(), 2);
        assert!(table.lookup(StateKey::plain(fp(1))).is_some_and(|s| s.is_fully_explored()));
    }

    #[test]
    fn test_remove() {
        let table = DeadStateTable::new();
        table.insert(DeadState::new(fp(4), 0, false));
        assert!(table.remove(StateKey::plain(fp(4))).is_some());
        assert!(table.is_empty());
    }
}
