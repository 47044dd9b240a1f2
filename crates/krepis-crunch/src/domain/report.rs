//! Search results, violation traces, statistics and progress snapshots

use crate::domain::state::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Summary verdict of a search
///
/// When several apply, the first in declaration order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// At least one safety (or stack-overflow) trace was found
    SafetyViolation,
    /// At least one accepting-cycle trace was found
    LivenessViolation,
    /// The caller cancelled the search before completion
    Canceled,
    /// The search completed without findings
    Success,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SafetyViolation => "safety violation",
            Self::LivenessViolation => "liveness violation",
            Self::Canceled => "canceled",
            Self::Success => "success",
        };
        f.write_str(label)
    }
}

/// What a trace demonstrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// An error state was reached
    Safety {
        /// Model-specific error code
        code: u32,
    },
    /// The local DFS stack hit its configured ceiling
    StackOverflow {
        /// Ceiling in force
        limit: usize,
    },
    /// Nested DFS closed a cycle through an accepting state
    AcceptingCycle,
    /// A random walk stalled away from accepting states
    StalledWalk,
}

impl ViolationKind {
    /// Belongs in the safety trace list
    pub const fn is_safety(self) -> bool {
        matches!(self, Self::Safety { .. } | Self::StackOverflow { .. })
    }

    /// Found by an unsound heuristic
    pub const fn is_heuristic(self) -> bool {
        matches!(self, Self::StalledWalk)
    }
}

/// Path of states demonstrating a violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationTrace {
    /// What the trace demonstrates
    pub kind: ViolationKind,
    /// Fingerprints from the initial state to the offending one, inclusive
    pub states: Vec<Fingerprint>,
    /// Worker that found it (`None` for driver-side probes)
    pub worker: Option<usize>,
    /// Iteration in which it was found
    pub iteration: u32,
}

impl ViolationTrace {
    /// Number of transitions along the trace
    pub fn len(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    /// Whether the trace has no transitions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last state of the trace
    pub fn last_state(&self) -> Option<Fingerprint> {
        self.states.last().copied()
    }
}

/// Point-in-time copy of the search counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Frames pushed on local stacks
    pub states_explored: u64,
    /// Successors generated
    pub transitions: u64,
    /// Successors dropped by the choice-cost ceiling
    pub pruned: u64,
    /// Positions deferred to a next frontier
    pub frontier_inserts: u64,
    /// Successful steals
    pub steals: u64,
    /// Deepest local stack observed
    pub max_stack_depth: u64,
    /// Completed iterations
    pub iterations: u64,
}

/// Progress information handed to the driver's callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// 1-based iteration number
    pub iteration: u32,
    /// Cutoff in force
    pub cutoff: u32,
    /// Frames pushed so far
    pub states_explored: u64,
    /// Distinct fingerprints retired so far
    pub distinct_states: u64,
    /// Size of the frontier being built (in-memory) or consumed (on disk)
    pub frontier_size: u64,
    /// Time since the search started
    pub elapsed: Duration,
}

/// Callback verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressControl {
    /// Keep searching
    #[default]
    Continue,
    /// Stop as soon as every worker observes the request
    Cancel,
}

/// Final result of [`Crunch::crunch`](crate::Crunch::crunch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrunchReport {
    /// Summary verdict
    pub outcome: Outcome,
    /// Safety and stack-overflow traces
    pub safety_traces: Vec<ViolationTrace>,
    /// Accepting-cycle and stalled-walk traces
    pub liveness_traces: Vec<ViolationTrace>,
    /// Counters at the end of the search
    pub stats: StatsSnapshot,
    /// Distinct fingerprints retired
    pub distinct_states: u64,
    /// Last cutoff applied
    pub final_cutoff: u32,
    /// Stopped at the cutoff ceiling with work still deferred
    pub bound_exhausted: bool,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl CrunchReport {
    /// No violation of either kind
    pub fn is_clean(&self) -> bool {
        self.safety_traces.is_empty() && self.liveness_traces.is_empty()
    }

    /// Liveness traces confirmed by nested DFS
    pub fn confirmed_cycles(&self) -> impl Iterator<Item = &ViolationTrace> {
        self.liveness_traces.iter().filter(|t| !t.kind.is_heuristic())
    }

    /// Liveness traces suggested by random walks
    pub fn heuristic_cycles(&self) -> impl Iterator<Item = &ViolationTrace> {
        self.liveness_traces.iter().filter(|t| t.kind.is_heuristic())
    }
}
