//! Frontier
//!
//! Positions deferred by the current cutoff, carried into the next iteration.
//!
//! # Structure
//!
//! ```text
//! iteration k                                   iteration k+1
//! ┌──────────────────┐   drain (by ordinal)    ┌────────────┐
//! │ FrontierSet<P>   │ ──────────────────────> │ Partitions │ ──> workers
//! │ DashMap<Key, E>  │                         └────────────┘
//! └──────────────────┘
//!        ▲ insert (dominance merge)
//!        │
//!    workers of iteration k
//! ```
//!
//! Entries are keyed by [`FrontierKey`]: the state plus the seed of the red
//! search that deferred it. Each key appears at most once. When two paths
//! defer the same key, the entry with the greater-or-equal active cost wins,
//! so a state is never carried forward at a shallower bound than one already
//! recorded. Red searches from different seeds keep separate entries for the
//! same magic state and never evict each other.

pub mod partition;

pub use partition::Partitions;

use crate::domain::bounds::BoundMode;
use crate::domain::model::TraversalPosition;
use crate::domain::state::{Bounds, Fingerprint, StateKey};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// One deferred position
#[derive(Debug, Clone)]
pub struct FrontierEntry<P> {
    /// State identity
    pub fingerprint: Fingerprint,
    /// Liveness phase marker
    pub magic_bit: bool,
    /// Cost snapshot at deferral
    pub bounds: Bounds,
    /// Resumable position
    pub position: P,
    /// Global insertion order
    pub ordinal: u64,
    /// Worker that deferred the position
    pub owner_worker: usize,
    /// Accepting state that started the enclosing red search, if any
    pub seed: Option<Fingerprint>,
}

impl<P: TraversalPosition> FrontierEntry<P> {
    /// Capture a position
    pub fn from_position(position: P, ordinal: u64, owner_worker: usize, seed: Option<Fingerprint>) -> Self {
        Self {
            fingerprint: position.fingerprint(),
            magic_bit: position.magic_bit(),
            bounds: position.bounds(),
            position,
            ordinal,
            owner_worker,
            seed,
        }
    }
}

impl<P> FrontierEntry<P> {
    /// Table key of the deferred state
    #[inline]
    pub fn key(&self) -> StateKey {
        StateKey::new(self.fingerprint, self.magic_bit)
    }

    /// Frontier identity of the entry
    #[inline]
    pub fn frontier_key(&self) -> FrontierKey {
        FrontierKey::new(self.key(), self.seed)
    }
}

/// Identity of a frontier entry: the state and the red search it belongs to
///
/// `seed` is `None` for ordinary visitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrontierKey {
    /// State identity
    pub state: StateKey,
    /// Accepting state that started the red search, if any
    pub seed: Option<Fingerprint>,
}

impl FrontierKey {
    /// Key for `state` deferred under `seed`
    #[inline]
    pub const fn new(state: StateKey, seed: Option<Fingerprint>) -> Self {
        Self { state, seed }
    }
}

impl From<StateKey> for FrontierKey {
    fn from(state: StateKey) -> Self {
        Self::new(state, None)
    }
}

/// Result of [`FrontierSet::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierInsert {
    /// No entry existed for the state
    Inserted,
    /// The new entry dominated and replaced the old one
    Replaced,
    /// The existing entry dominated; the new one was dropped
    Kept,
}

/// Concurrent set of deferred positions keyed by [`FrontierKey`]
#[derive(Debug)]
pub struct FrontierSet<P> {
    mode: BoundMode,
    entries: DashMap<FrontierKey, FrontierEntry<P>>,
}

impl<P: Clone> FrontierSet<P> {
    /// Create an empty frontier merging on the given bound axis
    pub fn new(mode: BoundMode) -> Self {
        Self {
            mode,
            entries: DashMap::new(),
        }
    }

    /// Insert `entry`, keeping whichever of it and any existing entry has the
    /// greater-or-equal active cost
    pub fn insert(&self, entry: FrontierEntry<P>) -> FrontierInsert {
        match self.entries.entry(entry.frontier_key()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                FrontierInsert::Inserted
            }
            Entry::Occupied(mut slot) => {
                let existing = self.mode.cost(&slot.get().bounds);
                if self.mode.cost(&entry.bounds) >= existing {
                    slot.insert(entry);
                    FrontierInsert::Replaced
                } else {
                    FrontierInsert::Kept
                }
            }
        }
    }

    /// Bounds recorded for `key`
    pub fn recorded_bounds(&self, key: FrontierKey) -> Option<Bounds> {
        self.entries.get(&key).map(|entry| entry.bounds)
    }

    /// Whether `key` is deferred
    pub fn contains(&self, key: FrontierKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Remove the entry for `key`
    pub fn remove(&self, key: FrontierKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Number of deferred states
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is deferred
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry, in ordinal order
    pub fn drain(&self) -> Vec<FrontierEntry<P>> {
        let keys: Vec<FrontierKey> = self.entries.iter().map(|entry| *entry.key()).collect();
        let mut entries: Vec<FrontierEntry<P>> = keys
            .into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|(_, entry)| entry))
            .collect();
        entries.sort_by_key(|entry| entry.ordinal);
        entries
    }
}
