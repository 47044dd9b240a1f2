//! Model Collaborator Contracts
//!
//! The engine knows nothing about what a state *is*. It drives positions
//! through these traits:
//!
//! ```text
//! Model::initial_position()
//!        │
//!        ▼
//! TraversalPosition ── next_successor(cutoff) ──> TraversalPosition ...
//!        │
//!        ├── fingerprint / bounds / magic_bit
//!        ├── status (Running | Terminated | Error)
//!        └── trace (path from the root)
//! ```
//!
//! Disk-backed frontiers additionally need a [`PositionCodec`] to move
//! positions through files.

use crate::domain::bounds::Cutoff;
use crate::domain::state::{Bounds, Fingerprint, StateKey};
use rand::RngCore;

/// Execution status reported by a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionStatus {
    /// Still has work to do
    Running,
    /// Reached a normal end state
    Terminated,
    /// Reached an error state (safety violation)
    Error {
        /// Model-specific error code
        code: u32,
    },
}

impl PositionStatus {
    /// Check if this is an error state
    #[inline(always)]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Resumable cursor over one model state and its successors
///
/// # Contract
///
/// - `fingerprint` identifies the state; equal fingerprints mean equal states.
/// - `next_successor` yields each successor once, then `None`. The cutoff is
///   passed through for models that want to skip generating obviously deferred
///   work; the engine applies the cutoff itself either way.
/// - `with_magic_bit` returns a copy of the same state, with the given phase
///   marker and the successor cursor rewound to the start.
/// - `trace` returns the fingerprints along the path from the initial state
///   to this one, inclusive.
pub trait TraversalPosition: Clone + Send + Sync + Sized {
    /// State identity
    fn fingerprint(&self) -> Fingerprint;

    /// Cost snapshot
    fn bounds(&self) -> Bounds;

    /// Whether this position has a stable identity usable for deduplication
    ///
    /// Positions without one (e.g. mid-way through an atomic step) are never
    /// deduplicated and never deferred.
    fn is_fingerprinted(&self) -> bool {
        true
    }

    /// Liveness phase marker
    fn magic_bit(&self) -> bool;

    /// Fresh copy with the given phase marker
    fn with_magic_bit(&self, magic_bit: bool) -> Self;

    /// Whether this is an accepting state of the liveness automaton
    fn is_accepting(&self) -> bool {
        false
    }

    /// Execution status
    fn status(&self) -> PositionStatus;

    /// Total number of successors this position will yield
    fn successor_count(&self) -> usize;

    /// Advance the successor cursor
    fn next_successor(&mut self, cutoff: &Cutoff) -> Option<Self>;

    /// One successor chosen uniformly at random, without moving the cursor
    fn random_successor(&self, rng: &mut dyn RngCore) -> Option<Self>;

    /// Path of fingerprints from the initial state to this one
    fn trace(&self) -> Vec<Fingerprint>;

    /// Table key of this position
    #[inline]
    fn key(&self) -> StateKey {
        StateKey::new(self.fingerprint(), self.magic_bit())
    }
}

/// A system under test
pub trait Model: Sync {
    /// Position type driven by the engine
    type Position: TraversalPosition;

    /// Position of the initial state
    fn initial_position(&self) -> Self::Position;
}

/// Serialization of positions for disk-backed frontiers
pub trait PositionCodec<P>: Sync {
    /// Append the encoding of `position` to `out`
    fn encode(&self, position: &P, out: &mut Vec<u8>);

    /// Rebuild a position from bytes produced by [`PositionCodec::encode`]
    fn decode(&self, bytes: &[u8]) -> Result<P, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(PositionStatus::Error { code: 3 }.is_error());
        assert!(!PositionStatus::Running.is_error());
        assert!(!PositionStatus::Terminated.is_error());
    }
}
