//! Exploration Core
//!
//! Everything a worker touches while walking: the run-scoped
//! [`SearchContext`], its counters, the violation log, the cancellation
//! token, and the sink that receives deferred positions.
//!
//! # Sharing Model
//!
//! ```text
//!                    SearchContext<P> (one per crunch)
//!   ┌──────────────┬──────────────┬──────────────┬───────────────┐
//!   │ DeadState    │ LiveState    │ FrontierSet  │ stats / log / │
//!   │ Table        │ Table        │ (next iter)  │ cancel token  │
//!   │ RwLock       │ DashMap      │ DashMap      │ atomics/Mutex │
//!   └──────────────┴──────────────┴──────────────┴───────────────┘
//!          ▲               ▲              ▲               ▲
//!          └───────────────┴──── &ctx ────┴───────────────┘
//!                    worker 0 .. worker N-1 (scoped threads)
//! ```
//!
//! Local stacks never leave their worker.

pub mod must_explore;
pub mod random_walk;
pub(crate) mod worker;

pub use must_explore::{must_explore, Decision, ExploreTables};

use crate::domain::bounds::BoundMode;
use crate::domain::config::CrunchConfig;
use crate::domain::error::SearchResult;
use crate::domain::frontier::{FrontierEntry, FrontierSet};
use crate::domain::report::{StatsSnapshot, ViolationTrace};
use crate::domain::state::{DeadStateTable, Fingerprint, LiveStateTable};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cancellation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a search was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelReason {
    /// A violation was found with stop-on-first-error set
    Violation = 1,
    /// The progress callback asked to stop
    Requested = 2,
    /// A worker failed
    Failure = 3,
}

impl CancelReason {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Violation),
            2 => Some(Self::Requested),
            3 => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Cooperative stop flag checked at every loop head
///
/// The first reason recorded wins.
#[derive(Debug, Default)]
pub struct CancellationToken {
    canceled: AtomicBool,
    reason: AtomicU8,
}

impl CancellationToken {
    /// Create a token that is not canceled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self, reason: CancelReason) {
        let _ = self
            .reason
            .compare_exchange(0, reason as u8, Ordering::AcqRel, Ordering::Acquire);
        self.canceled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// First recorded reason
    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_u8(self.reason.load(Ordering::Acquire))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Statistics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Search counters, updated with relaxed atomics
#[derive(Debug, Default)]
pub struct SearchStats {
    states_explored: AtomicU64,
    transitions: AtomicU64,
    pruned: AtomicU64,
    frontier_inserts: AtomicU64,
    steals: AtomicU64,
    max_stack_depth: AtomicU64,
    iterations: AtomicU64,
}

impl SearchStats {
    pub(crate) fn record_push(&self, stack_depth: usize) {
        self.states_explored.fetch_add(1, Ordering::Relaxed);
        self.max_stack_depth
            .fetch_max(stack_depth as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frontier_insert(&self) {
        self.frontier_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_steal(&self) {
        self.steals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames pushed so far
    pub fn states_explored(&self) -> u64 {
        self.states_explored.load(Ordering::Relaxed)
    }

    /// Copy every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            states_explored: self.states_explored.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            frontier_inserts: self.frontier_inserts.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            max_stack_depth: self.max_stack_depth.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Violation Log
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default)]
struct ViolationLogInner {
    safety: Vec<ViolationTrace>,
    liveness: Vec<ViolationTrace>,
    cycle_keys: HashSet<Fingerprint>,
}

/// Shared collection of traces found during the run
#[derive(Debug, Default)]
pub struct ViolationLog {
    inner: Mutex<ViolationLogInner>,
}

impl ViolationLog {
    /// Append a safety or stack-overflow trace
    pub fn record_safety(&self, trace: ViolationTrace) {
        self.inner.lock().safety.push(trace);
    }

    /// Append a liveness trace unless one was already recorded under `key`
    pub fn record_liveness(&self, key: Fingerprint, trace: ViolationTrace) -> bool {
        let mut inner = self.inner.lock();
        if !inner.cycle_keys.insert(key) {
            return false;
        }
        inner.liveness.push(trace);
        true
    }

    /// Copies of both trace lists
    pub fn snapshot(&self) -> (Vec<ViolationTrace>, Vec<ViolationTrace>) {
        let inner = self.inner.lock();
        (inner.safety.clone(), inner.liveness.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Search Context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Walk options copied out of the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSettings {
    /// Active bound axis
    pub mode: BoundMode,
    /// Nested-DFS accepting-cycle search
    pub liveness: bool,
    /// Cancel at the first violation
    pub stop_on_first_error: bool,
    /// Local stack ceiling
    pub max_stack_depth: usize,
}

impl From<&CrunchConfig> for WalkSettings {
    fn from(config: &CrunchConfig) -> Self {
        Self {
            mode: config.bound_mode,
            liveness: config.liveness,
            stop_on_first_error: config.stop_on_first_error,
            max_stack_depth: config.max_stack_depth,
        }
    }
}

/// Run-scoped state shared by every worker of one search
#[derive(Debug)]
pub struct SearchContext<P> {
    settings: WalkSettings,
    dead: DeadStateTable,
    live: LiveStateTable,
    next_frontier: FrontierSet<P>,
    stats: SearchStats,
    violations: ViolationLog,
    cancel: CancellationToken,
    ordinals: AtomicU64,
    iteration: AtomicU32,
}

impl<P: Clone> SearchContext<P> {
    /// Fresh context with empty tables
    pub fn new(settings: WalkSettings) -> Self {
        Self {
            settings,
            dead: DeadStateTable::new(),
            live: LiveStateTable::new(),
            next_frontier: FrontierSet::new(settings.mode),
            stats: SearchStats::default(),
            violations: ViolationLog::default(),
            cancel: CancellationToken::new(),
            ordinals: AtomicU64::new(0),
            iteration: AtomicU32::new(1),
        }
    }

    /// Walk options
    pub fn settings(&self) -> &WalkSettings {
        &self.settings
    }

    /// Permanent records
    pub fn dead(&self) -> &DeadStateTable {
        &self.dead
    }

    /// Current iteration's records
    pub fn live(&self) -> &LiveStateTable {
        &self.live
    }

    /// Frontier being built for the next iteration
    pub fn next_frontier(&self) -> &FrontierSet<P> {
        &self.next_frontier
    }

    /// Counters
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Traces found so far
    pub fn violations(&self) -> &ViolationLog {
        &self.violations
    }

    /// Stop flag
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Next frontier ordinal
    pub fn next_ordinal(&self) -> u64 {
        self.ordinals.fetch_add(1, Ordering::Relaxed)
    }

    /// 1-based iteration in progress
    pub fn iteration(&self) -> u32 {
        self.iteration.load(Ordering::Relaxed)
    }

    pub(crate) fn set_iteration(&self, iteration: u32) {
        self.iteration.store(iteration, Ordering::Relaxed);
    }

    /// Tables consulted by must-explore, with an optional resident frontier
    pub fn tables<'a>(&'a self, frontier: Option<&'a FrontierSet<P>>) -> ExploreTables<'a, P> {
        ExploreTables {
            dead: &self.dead,
            live: &self.live,
            frontier,
        }
    }

    /// Distinct states reached so far, including the running iteration
    ///
    /// Exact between iterations. While workers run it also counts states
    /// already in the live table, and may briefly count a state that is being
    /// re-walked from a spilled frontier in both tables.
    pub fn distinct_states_seen(&self) -> u64 {
        (self.dead.distinct_states() + self.live.distinct_states()) as u64
    }

    /// Fold the live table into the dead table
    pub fn fold(&self) -> usize {
        self.live.fold_into(&self.dead)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frontier Sinks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Destination of positions deferred to the next iteration
pub(crate) trait FrontierSink<P> {
    /// Frontier visible to must-explore, `None` when it lives on disk
    fn resident(&self) -> Option<&FrontierSet<P>>;

    /// Accept a deferred position
    fn offer(&mut self, entry: FrontierEntry<P>) -> SearchResult<()>;
}

/// Sink writing straight into the in-memory next frontier
pub(crate) struct ResidentSink<'a, P> {
    frontier: &'a FrontierSet<P>,
}

impl<'a, P> ResidentSink<'a, P> {
    pub(crate) fn new(frontier: &'a FrontierSet<P>) -> Self {
        Self { frontier }
    }
}

impl<P: Clone> FrontierSink<P> for ResidentSink<'_, P> {
    fn resident(&self) -> Option<&FrontierSet<P>> {
        Some(self.frontier)
    }

    fn offer(&mut self, entry: FrontierEntry<P>) -> SearchResult<()> {
        self.frontier.insert(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ViolationKind;
    use crate::domain::state::{LiveState, StateKey, UNSET_DEPTH};

    #[test]
    fn test_first_cancel_reason_wins() {
        let token = CancellationToken::new();
        assert!(!token.is_canceled());
        assert_eq!(token.reason(), None);

        token.cancel(CancelReason::Violation);
        token.cancel(CancelReason::Requested);
        assert!(token.is_canceled());
        assert_eq!(token.reason(), Some(CancelReason::Violation));
    }

    #[test]
    fn test_stats_track_max_stack_depth() {
        let stats = SearchStats::default();
        stats.record_push(3);
        stats.record_push(7);
        stats.record_push(2);
        let snap = stats.snapshot();
        assert_eq!(snap.states_explored, 3);
        assert_eq!(snap.max_stack_depth, 7);
    }

    #[test]
    fn test_liveness_traces_deduplicated_by_key() {
        let log = ViolationLog::default();
        let trace = ViolationTrace {
            kind: ViolationKind::AcceptingCycle,
            states: vec![Fingerprint::new(1), Fingerprint::new(2), Fingerprint::new(1)],
            worker: Some(0),
            iteration: 2,
        };
        assert!(log.record_liveness(Fingerprint::new(1), trace.clone()));
        assert!(!log.record_liveness(Fingerprint::new(1), trace));
        assert_eq!(log.snapshot().1.len(), 1);
    }

    #[test]
    fn test_ordinals_increase() {
        let ctx: SearchContext<u64> = SearchContext::new(WalkSettings {
            mode: BoundMode::Depth,
            liveness: false,
            stop_on_first_error: true,
            max_stack_depth: 16,
        });
        let a = ctx.next_ordinal();
        let b = ctx.next_ordinal();
        assert!(b > a);
        assert_eq!(ctx.iteration(), 1);
    }

    #[test]
    fn test_distinct_states_seen_counts_running_iteration() {
        let ctx: SearchContext<u64> = SearchContext::new(WalkSettings {
            mode: BoundMode::Depth,
            liveness: true,
            stop_on_first_error: true,
            max_stack_depth: 16,
        });
        ctx.live().retire(StateKey::plain(Fingerprint::new(1)), UNSET_DEPTH);
        ctx.fold();
        ctx.live().insert(StateKey::plain(Fingerprint::new(2)), LiveState::in_progress(1, false));
        ctx.live().insert(StateKey::new(Fingerprint::new(2), true), LiveState::in_progress(1, true));
        assert_eq!(ctx.dead().distinct_states(), 1);
        assert_eq!(ctx.distinct_states_seen(), 2);

        ctx.fold();
        assert_eq!(ctx.distinct_states_seen(), 2);
    }
}
