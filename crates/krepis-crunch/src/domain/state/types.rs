//! State Identity & Bookkeeping Records
//!
//! # Overview
//!
//! These are the small value types every other component passes around:
//!
//! ```text
//! Fingerprint ──┐
//!               ├──> StateKey ──> DeadStateTable / LiveStateTable / FrontierSet
//! magic bit ────┘
//!
//! Bounds      : (depth, delay, choice_cost) snapshot of one traversal position
//! DeadState   : permanent record, survives iterations
//! LiveState   : per-iteration record, folded into DeadState at iteration end
//! ```
//!
//! # Re-exploration Depth
//!
//! Both records carry `explore_if_depth_lower_than`. A state reached again at a
//! depth strictly lower than this value still has unexplored budget below it and
//! must be walked again. [`UNSET_DEPTH`] means "nothing below was cut off".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for an unset re-exploration depth
pub const UNSET_DEPTH: i32 = -1;

/// Fixed-size identity of a model state
///
/// Produced by the model collaborator. Two positions with equal fingerprints
/// are the same state as far as the search is concerned; collisions are
/// assumed not to occur.
///
/// # Example
///
/// ```rust
/// use krepis_crunch::Fingerprint;
///
/// let a = Fingerprint::new(0xdead_beef);
/// assert_eq!(a.as_u64(), 0xdead_beef);
/// assert_eq!(format!("{}", a), "fp:00000000deadbeef");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Wrap a raw fingerprint value
    #[inline(always)]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fp:{:016x}", self.0)
    }
}

/// Table key: fingerprint plus liveness phase marker
///
/// # Design Notes
///
/// A state seen during the red (cycle-hunting) phase of the nested DFS is a
/// different search node from the same state seen during ordinary
/// visitation. Keying every table by `(fingerprint, magic_bit)` keeps the two
/// apart without a second set of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// State identity
    pub fingerprint: Fingerprint,
    /// Liveness phase marker
    pub magic_bit: bool,
}

impl StateKey {
    /// Key for a state in the given liveness phase
    #[inline(always)]
    pub const fn new(fingerprint: Fingerprint, magic_bit: bool) -> Self {
        Self { fingerprint, magic_bit }
    }

    /// Key for ordinary (blue) visitation
    #[inline(always)]
    pub const fn plain(fingerprint: Fingerprint) -> Self {
        Self::new(fingerprint, false)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.magic_bit {
            write!(f, "{}*", self.fingerprint)
        } else {
            write!(f, "{}", self.fingerprint)
        }
    }
}

/// Cost snapshot of one traversal position
///
/// - `depth`: path length from the root
/// - `delay`: scheduling delays applied so far (scheduler-driven models only)
/// - `choice_cost`: bounded nondeterministic choices consumed
///
/// Models derive a successor's bounds from its parent's with [`Bounds::step`],
/// [`Bounds::delayed`] and [`Bounds::with_choice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Path length from the root
    pub depth: u32,
    /// Scheduling delays applied
    pub delay: u32,
    /// Bounded choices consumed
    pub choice_cost: u32,
}

impl Bounds {
    /// Bounds of the initial position
    pub const ROOT: Self = Self::new(0, 0, 0);

    /// Create a bounds snapshot
    #[inline(always)]
    pub const fn new(depth: u32, delay: u32, choice_cost: u32) -> Self {
        Self { depth, delay, choice_cost }
    }

    /// One transition deeper
    #[inline(always)]
    pub const fn step(self) -> Self {
        Self::new(self.depth + 1, self.delay, self.choice_cost)
    }

    /// One scheduling delay more
    #[inline(always)]
    pub const fn delayed(self) -> Self {
        Self::new(self.depth, self.delay + 1, self.choice_cost)
    }

    /// One bounded choice more
    #[inline(always)]
    pub const fn with_choice(self) -> Self {
        Self::new(self.depth, self.delay, self.choice_cost + 1)
    }

    /// Depth as a signed re-exploration value
    #[inline(always)]
    pub const fn depth_i32(self) -> i32 {
        self.depth as i32
    }
}

/// Permanently retired state
///
/// Lives in the Dead-State Table across iterations until evicted by a deeper
/// re-exploration. `explore_if_depth_lower_than <= 0` means fully explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeadState {
    /// State identity
    pub fingerprint: Fingerprint,
    /// Re-explore when reached strictly shallower than this
    pub explore_if_depth_lower_than: i32,
    /// Liveness phase marker
    pub magic_bit: bool,
}

impl DeadState {
    /// Create a dead-state record
    pub const fn new(fingerprint: Fingerprint, explore_if_depth_lower_than: i32, magic_bit: bool) -> Self {
        Self { fingerprint, explore_if_depth_lower_than, magic_bit }
    }

    /// Table key of this record
    #[inline(always)]
    pub const fn key(&self) -> StateKey {
        StateKey::new(self.fingerprint, self.magic_bit)
    }

    /// No depth can trigger another walk
    #[inline(always)]
    pub const fn is_fully_explored(&self) -> bool {
        self.explore_if_depth_lower_than <= 0
    }
}

/// State reached in the current iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveState {
    /// Re-explore when reached strictly shallower than this
    pub explore_if_depth_lower_than: i32,
    /// Every successor was retired without a cutoff below
    pub completely_explored: bool,
    /// Liveness phase marker
    pub magic_bit: bool,
}

impl LiveState {
    /// Record for a state whose local walk has just started at `depth`
    ///
    /// While the walk is in progress, reaching the state again at the same or a
    /// greater depth is a duplicate; only a strictly shallower path re-enters.
    pub const fn in_progress(depth: u32, magic_bit: bool) -> Self {
        Self {
            explore_if_depth_lower_than: depth as i32,
            completely_explored: false,
            magic_bit,
        }
    }

    /// Record for a state whose local walk has finished
    ///
    /// `explore_if_depth_lower_than == UNSET_DEPTH` means no descendant was
    /// cut off and the state is complete.
    pub const fn retired(explore_if_depth_lower_than: i32, magic_bit: bool) -> Self {
        Self {
            explore_if_depth_lower_than,
            completely_explored: explore_if_depth_lower_than == UNSET_DEPTH,
            magic_bit,
        }
    }

    /// Stabilize into a permanent record
    pub const fn into_dead(self, fingerprint: Fingerprint) -> DeadState {
        let depth = if self.completely_explored {
            0
        } else {
            self.explore_if_depth_lower_than
        };
        DeadState::new(fingerprint, depth, self.magic_bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key_separates_phases() {
        let fp = Fingerprint::new(7);
        assert_ne!(StateKey::plain(fp), StateKey::new(fp, true));
        assert_eq!(format!("{}", StateKey::new(fp, true)), "fp:0000000000000007*");
    }

    #[test]
    fn test_bounds_builders() {
        let b = Bounds::ROOT.step().delayed().with_choice().step();
        assert_eq!(b, Bounds::new(2, 1, 1));
    }

    #[test]
    fn test_retired_live_state_completion() {
        assert!(LiveState::retired(UNSET_DEPTH, false).completely_explored);
        assert!(!LiveState::retired(3, false).completely_explored);
        assert!(!LiveState::in_progress(3, false).completely_explored);
    }

    #[test]
    fn test_fold_into_dead() {
        let fp = Fingerprint::new(1);

        let complete = LiveState::retired(UNSET_DEPTH, false).into_dead(fp);
        assert_eq!(complete.explore_if_depth_lower_than, 0);
        assert!(complete.is_fully_explored());

        let partial = LiveState::retired(4, true).into_dead(fp);
        assert_eq!(partial.explore_if_depth_lower_than, 4);
        assert!(partial.magic_bit);
        assert!(!partial.is_fully_explored());
    }
}
