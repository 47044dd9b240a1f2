//! Bound Controller
//!
//! Owns the iteration's cutoff: which bound axis is active, the value past
//! which positions are deferred, and the schedule by which that value grows.
//!
//! # Cutoff Semantics
//!
//! A position whose active cost is `>= cutoff` is not expanded; it goes to the
//! next frontier instead. With the default linear schedule the first
//! iteration (cutoff 1) expands the root at cost 0 and defers its children.
//!
//! # Termination
//!
//! The driver stops when the next frontier is empty, or when the controller
//! has reached its ceiling and there is no larger cutoff left to apply.

use crate::domain::state::Bounds;
use serde::{Deserialize, Serialize};

/// Bound axis that drives iterative deepening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundMode {
    /// Path length from the root
    #[default]
    Depth,
    /// Scheduling delays applied
    Delay,
}

impl BoundMode {
    /// Active cost of `bounds` on this axis
    #[inline(always)]
    pub const fn cost(self, bounds: &Bounds) -> u32 {
        match self {
            Self::Depth => bounds.depth,
            Self::Delay => bounds.delay,
        }
    }
}

/// Growth schedule of the cutoff value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffSchedule {
    /// `initial, initial + step, initial + 2*step, ...`
    Linear {
        /// First cutoff
        initial: u32,
        /// Increment per iteration
        step: u32,
    },
    /// Fixed, strictly increasing list of cutoffs
    Explicit(Vec<u32>),
}

impl Default for CutoffSchedule {
    fn default() -> Self {
        Self::Linear { initial: 1, step: 1 }
    }
}

/// The bound in force for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    /// Active axis
    pub mode: BoundMode,
    /// Positions with active cost at or beyond this are deferred
    pub value: u32,
    /// Positions whose choice cost exceeds this are pruned for good
    pub max_choice_cost: Option<u32>,
}

impl Cutoff {
    /// Whether `bounds` is at or beyond the cutoff
    #[inline]
    pub fn reached(&self, bounds: &Bounds) -> bool {
        self.mode.cost(bounds) >= self.value
    }

    /// Whether `bounds` exceeds the choice-cost ceiling
    #[inline]
    pub fn choice_exceeded(&self, bounds: &Bounds) -> bool {
        self.max_choice_cost.is_some_and(|max| bounds.choice_cost > max)
    }
}

/// Drives the cutoff from iteration to iteration
#[derive(Debug, Clone)]
pub struct BoundController {
    mode: BoundMode,
    schedule: CutoffSchedule,
    max_cutoff: Option<u32>,
    max_choice_cost: Option<u32>,
    current: u32,
    index: usize,
    iteration: u32,
}

impl BoundController {
    /// Create a controller positioned at the first scheduled cutoff
    ///
    /// An explicit schedule must be non-empty; configuration validation
    /// guarantees this before a controller is built.
    pub fn new(
        mode: BoundMode,
        schedule: CutoffSchedule,
        max_cutoff: Option<u32>,
        max_choice_cost: Option<u32>,
    ) -> Self {
        let first = match &schedule {
            CutoffSchedule::Linear { initial, .. } => *initial,
            CutoffSchedule::Explicit(values) => values.first().copied().unwrap_or(1),
        };
        let current = max_cutoff.map_or(first, |max| first.min(max));
        Self {
            mode,
            schedule,
            max_cutoff,
            max_choice_cost,
            current,
            index: 0,
            iteration: 1,
        }
    }

    /// Cutoff for the current iteration
    pub fn cutoff(&self) -> Cutoff {
        Cutoff {
            mode: self.mode,
            value: self.current,
            max_choice_cost: self.max_choice_cost,
        }
    }

    /// 1-based iteration number
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// No larger cutoff remains to be applied
    pub fn at_ceiling(&self) -> bool {
        if self.max_cutoff.is_some_and(|max| self.current >= max) {
            return true;
        }
        match &self.schedule {
            CutoffSchedule::Linear { step, .. } => *step == 0,
            CutoffSchedule::Explicit(values) => self.index + 1 >= values.len(),
        }
    }

    /// Move to the next cutoff
    ///
    /// Returns `false`, leaving the controller unchanged, when already at the
    /// ceiling. The cutoff never decreases.
    pub fn advance(&mut self) -> bool {
        if self.at_ceiling() {
            return false;
        }
        let next = match &self.schedule {
            CutoffSchedule::Linear { step, .. } => self.current.saturating_add(*step),
            CutoffSchedule::Explicit(values) => {
                self.index += 1;
                values[self.index]
            }
        };
        let next = self.max_cutoff.map_or(next, |max| next.min(max));
        self.current = self.current.max(next);
        self.iteration += 1;
        true
    }

    /// Whether the search is over given the size of the next frontier
    pub fn is_complete(&self, next_frontier_len: usize) -> bool {
        next_frontier_len == 0 || self.at_ceiling()
    }
}
