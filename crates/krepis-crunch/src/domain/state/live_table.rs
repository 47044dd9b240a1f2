//! Live-State Table
//!
//! States reached during the current iteration. Workers hit this table on
//! every push and retire, so it is sharded (`DashMap`) rather than guarded by
//! one lock. At the end of the iteration, with all workers joined, it is
//! folded into the [`DeadStateTable`] and cleared.

use super::dead_table::DeadStateTable;
use super::types::{DeadState, LiveState, StateKey};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Per-iteration record of reached states
#[derive(Debug, Default)]
pub struct LiveStateTable {
    states: DashMap<StateKey, LiveState>,
}

impl LiveStateTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record under `key`
    pub fn insert(&self, key: StateKey, state: LiveState) {
        self.states.insert(key, state);
    }

    /// Insert only if no record exists under `key`
    ///
    /// Returns `true` for the single caller that won the slot.
    pub fn try_claim(&self, key: StateKey, state: LiveState) -> bool {
        match self.states.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(state);
                true
            }
        }
    }

    /// Mark the local walk of `key` finished with the given re-exploration depth
    pub fn retire(&self, key: StateKey, explore_if_depth_lower_than: i32) {
        self.states
            .insert(key, LiveState::retired(explore_if_depth_lower_than, key.magic_bit));
    }

    /// Copy of the record under `key`
    pub fn lookup(&self, key: StateKey) -> Option<LiveState> {
        self.states.get(&key).map(|state| *state)
    }

    /// Whether a record exists under `key`
    pub fn contains(&self, key: StateKey) -> bool {
        self.states.contains_key(&key)
    }

    /// Remove the record under `key`
    pub fn remove(&self, key: StateKey) -> Option<LiveState> {
        self.states.remove(&key).map(|(_, state)| state)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of records reached during ordinary visitation
    pub fn distinct_states(&self) -> usize {
        self.states.iter().filter(|entry| !entry.key().magic_bit).count()
    }

    /// Move every record into `dead` and clear this table
    ///
    /// Must only run while no worker touches either table. Folding an empty
    /// table is a no-op, so repeated folds leave `dead` unchanged.
    pub fn fold_into(&self, dead: &DeadStateTable) -> usize {
        let records: Vec<DeadState> = self
            .states
            .iter()
            .map(|entry| entry.value().into_dead(entry.key().fingerprint))
            .collect();
        self.states.clear();
        dead.absorb(records)
    }
}
