//! Partitioned DFS Worker
//!
//! One worker drains frontier entries (its own partition first, then stolen
//! batches) and runs a bounded depth-first walk from each, on an explicit
//! stack of [`LocalStackFrame`]s.
//!
//! # Successor Handling
//!
//! Every generated successor goes through these checks, in order:
//!
//! ```text
//! 1. red phase, fingerprint == seed, accepting  → accepting cycle
//! 2. status == Error                             → safety violation
//! 3. choice cost above ceiling                   → pruned
//! 4. no stable fingerprint                       → push frame
//! 5. must-explore says skip                      → parent bookkeeping only
//! 6. cost >= cutoff                              → deferred to next frontier
//!    otherwise                                   → push frame
//! ```
//!
//! # Re-exploration Depth
//!
//! A frame starts with `explore_if_depth_lower_than` unset. Each child that
//! was deferred or only partially covered at depth `x` raises the parent's
//! value to `x - 1`, so a state is marked relative to its own depth: reaching
//! it again strictly shallower means the deferred work is now in reach.
//!
//! # Nested DFS
//!
//! When an accepting frame without the magic bit is exhausted, it is replaced
//! in place by a magic copy of itself whose seed is its own fingerprint. The
//! parent is only notified once that red frame retires. Red positions are
//! deferred under their seed, so each red search resumes in the next
//! iteration even when another seed deferred the same magic state.

use super::{must_explore, CancelReason, Decision, FrontierSink, ResidentSink, SearchContext};
use crate::domain::bounds::Cutoff;
use crate::domain::error::SearchResult;
use crate::domain::frontier::{FrontierEntry, FrontierKey, Partitions};
use crate::domain::model::{PositionStatus, TraversalPosition};
use crate::domain::report::{ViolationKind, ViolationTrace};
use crate::domain::state::{Fingerprint, LiveState, StateKey, UNSET_DEPTH};
use tracing::{debug, warn};

/// How a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// No entries left anywhere
    Drained,
    /// Observed the cancellation token
    Canceled,
}

/// Per-worker statistics handed back to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerSummary {
    pub worker: usize,
    pub exit: WorkerExit,
    pub entries: u64,
    pub steals: u64,
}

/// Whether the caller should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Canceled,
}

struct LocalStackFrame<P> {
    position: P,
    descendants_left: usize,
    explore_if_depth_lower_than: i32,
    seed: Option<Fingerprint>,
    tracked: bool,
}

/// Bounded DFS over one iteration's entries
pub(crate) struct Walker<'a, P> {
    worker: usize,
    ctx: &'a SearchContext<P>,
    cutoff: Cutoff,
    stack: Vec<LocalStackFrame<P>>,
    entries: u64,
    steals: u64,
}

impl<'a, P: TraversalPosition> Walker<'a, P> {
    pub(crate) fn new(worker: usize, ctx: &'a SearchContext<P>, cutoff: Cutoff) -> Self {
        Self {
            worker,
            ctx,
            cutoff,
            stack: Vec::new(),
            entries: 0,
            steals: 0,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Entry Loop
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Drain the in-memory partitions, deferring into the resident frontier
    pub(crate) fn run_partition(mut self, partitions: &Partitions<P>) -> SearchResult<WorkerSummary> {
        let mut sink = ResidentSink::new(self.ctx.next_frontier());
        loop {
            if self.ctx.cancel_token().is_canceled() {
                return Ok(self.summary(WorkerExit::Canceled));
            }
            let Some((entry, steal)) = partitions.next(self.worker) else {
                return Ok(self.summary(WorkerExit::Drained));
            };
            if let Some(report) = steal {
                self.steals += 1;
                self.ctx.stats().record_steal();
                debug!(
                    worker = self.worker,
                    victim = report.victim,
                    count = report.count,
                    "stole frontier batch"
                );
            }
            if self.process_entry(entry, &mut sink)? == Flow::Canceled {
                return Ok(self.summary(WorkerExit::Canceled));
            }
        }
    }

    /// Final statistics, logged at debug level
    pub(crate) fn summary(&self, exit: WorkerExit) -> WorkerSummary {
        let summary = WorkerSummary {
            worker: self.worker,
            exit,
            entries: self.entries,
            steals: self.steals,
        };
        debug!(
            worker = summary.worker,
            entries = summary.entries,
            steals = summary.steals,
            exit = ?summary.exit,
            "worker finished"
        );
        summary
    }

    /// Handle one frontier entry
    ///
    /// Must-explore is consulted for the entry only when the sink exposes a
    /// resident frontier; disk-backed sinks skip it. Entries carrying a seed
    /// resume a red search for that seed and are always walked, since another
    /// seed's red search may already have claimed the same magic key.
    pub(crate) fn process_entry<S: FrontierSink<P>>(
        &mut self,
        entry: FrontierEntry<P>,
        sink: &mut S,
    ) -> SearchResult<Flow> {
        self.entries += 1;

        if let PositionStatus::Error { code } = entry.position.status() {
            return Ok(self.report_error(&entry.position, code));
        }

        let tracked = entry.position.is_fingerprinted();
        if tracked && entry.seed.is_none() {
            if let Some(frontier) = sink.resident() {
                let decision = must_explore(
                    &self.ctx.tables(Some(frontier)),
                    self.ctx.settings().mode,
                    entry.frontier_key(),
                    &entry.bounds,
                );
                if decision != Decision::Explore {
                    return Ok(Flow::Continue);
                }
            }
        }

        if self.cutoff.choice_exceeded(&entry.bounds) {
            self.ctx.stats().record_pruned();
            return Ok(Flow::Continue);
        }

        if tracked && self.cutoff.reached(&entry.bounds) {
            sink.offer(entry)?;
            self.ctx.stats().record_frontier_insert();
            return Ok(Flow::Continue);
        }

        self.walk(entry.position, entry.seed, sink)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Local Walk
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn walk<S: FrontierSink<P>>(
        &mut self,
        root: P,
        seed: Option<Fingerprint>,
        sink: &mut S,
    ) -> SearchResult<Flow> {
        self.stack.clear();
        self.push(root, seed);

        loop {
            if self.ctx.cancel_token().is_canceled() {
                self.stack.clear();
                return Ok(Flow::Canceled);
            }
            let Some(top) = self.stack.last_mut() else {
                return Ok(Flow::Continue);
            };
            if top.descendants_left == 0 {
                self.retire_top();
                continue;
            }
            let Some(successor) = top.position.next_successor(&self.cutoff) else {
                self.retire_top();
                continue;
            };
            let seed = top.seed;
            let red = top.position.magic_bit();
            self.ctx.stats().record_transition();

            let successor = if red && !successor.magic_bit() {
                successor.with_magic_bit(true)
            } else {
                successor
            };
            if self.expand(successor, seed, sink)? == Flow::Canceled {
                self.stack.clear();
                return Ok(Flow::Canceled);
            }
        }
    }

    fn expand<S: FrontierSink<P>>(
        &mut self,
        successor: P,
        seed: Option<Fingerprint>,
        sink: &mut S,
    ) -> SearchResult<Flow> {
        if let Some(seed_fp) = seed {
            if successor.magic_bit()
                && successor.fingerprint() == seed_fp
                && successor.is_accepting()
            {
                self.child_complete();
                return Ok(self.report_cycle(&successor, seed_fp));
            }
        }

        if let PositionStatus::Error { code } = successor.status() {
            self.child_complete();
            return Ok(self.report_error(&successor, code));
        }

        let bounds = successor.bounds();
        if self.cutoff.choice_exceeded(&bounds) {
            self.ctx.stats().record_pruned();
            self.child_complete();
            return Ok(Flow::Continue);
        }

        if !successor.is_fingerprinted() {
            return Ok(self.push_checked(successor, seed));
        }

        let decision = must_explore(
            &self.ctx.tables(sink.resident()),
            self.ctx.settings().mode,
            FrontierKey::new(successor.key(), seed),
            &bounds,
        );

        if self.cutoff.reached(&bounds) {
            match decision {
                Decision::Explore => {
                    let ordinal = self.ctx.next_ordinal();
                    sink.offer(FrontierEntry::from_position(successor, ordinal, self.worker, seed))?;
                    self.ctx.stats().record_frontier_insert();
                    self.child_partial(bounds.depth_i32());
                }
                Decision::FullyExplored => self.child_complete(),
                Decision::PartiallyExplored { explore_if_depth_lower_than } => {
                    self.child_partial(explore_if_depth_lower_than);
                }
            }
            return Ok(Flow::Continue);
        }

        match decision {
            Decision::Explore => Ok(self.push_checked(successor, seed)),
            Decision::FullyExplored => {
                self.child_complete();
                Ok(Flow::Continue)
            }
            Decision::PartiallyExplored { explore_if_depth_lower_than } => {
                self.child_partial(explore_if_depth_lower_than);
                Ok(Flow::Continue)
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Frame Bookkeeping
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn push(&mut self, position: P, seed: Option<Fingerprint>) {
        let tracked = position.is_fingerprinted();
        if tracked {
            self.ctx.live().insert(
                position.key(),
                LiveState::in_progress(position.bounds().depth, position.magic_bit()),
            );
        }
        self.stack.push(LocalStackFrame {
            descendants_left: position.successor_count(),
            explore_if_depth_lower_than: UNSET_DEPTH,
            seed,
            tracked,
            position,
        });
        self.ctx.stats().record_push(self.stack.len());
    }

    fn push_checked(&mut self, position: P, seed: Option<Fingerprint>) -> Flow {
        if self.stack.len() < self.ctx.settings().max_stack_depth {
            self.push(position, seed);
            return Flow::Continue;
        }
        let depth = position.bounds().depth_i32();
        self.child_partial(depth);
        self.report_overflow(&position)
    }

    fn retire_top(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let LocalStackFrame {
            position,
            explore_if_depth_lower_than,
            tracked,
            ..
        } = frame;

        if tracked {
            self.ctx.live().retire(position.key(), explore_if_depth_lower_than);
        }

        if tracked
            && self.ctx.settings().liveness
            && !position.magic_bit()
            && position.is_accepting()
        {
            let red = position.with_magic_bit(true);
            let seed = red.fingerprint();
            self.ctx.live().insert(
                red.key(),
                LiveState::in_progress(red.bounds().depth, true),
            );
            self.stack.push(LocalStackFrame {
                descendants_left: red.successor_count(),
                explore_if_depth_lower_than,
                seed: Some(seed),
                tracked: true,
                position: red,
            });
            self.ctx.stats().record_push(self.stack.len());
            return;
        }

        self.child_partial(explore_if_depth_lower_than);
    }

    fn child_complete(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.descendants_left = top.descendants_left.saturating_sub(1);
        }
    }

    fn child_partial(&mut self, child_explore_if_depth_lower_than: i32) {
        if let Some(top) = self.stack.last_mut() {
            top.descendants_left = top.descendants_left.saturating_sub(1);
            top.explore_if_depth_lower_than = top
                .explore_if_depth_lower_than
                .max(child_explore_if_depth_lower_than - 1);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Violations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Record a safety violation once per state
    fn report_error(&self, position: &P, code: u32) -> Flow {
        if position.is_fingerprinted() {
            let key = StateKey::plain(position.fingerprint());
            let first = !self.ctx.dead().contains(key)
                && self
                    .ctx
                    .live()
                    .try_claim(key, LiveState::retired(UNSET_DEPTH, false));
            if !first {
                return Flow::Continue;
            }
        }
        let states = position.trace();
        warn!(
            worker = self.worker,
            code,
            depth = states.len().saturating_sub(1),
            state = %position.fingerprint(),
            "safety violation"
        );
        self.ctx.violations().record_safety(ViolationTrace {
            kind: ViolationKind::Safety { code },
            states,
            worker: Some(self.worker),
            iteration: self.ctx.iteration(),
        });
        self.after_violation()
    }

    fn report_cycle(&self, position: &P, seed: Fingerprint) -> Flow {
        let states = position.trace();
        let depth = states.len().saturating_sub(1);
        let recorded = self.ctx.violations().record_liveness(
            seed,
            ViolationTrace {
                kind: ViolationKind::AcceptingCycle,
                states,
                worker: Some(self.worker),
                iteration: self.ctx.iteration(),
            },
        );
        if !recorded {
            return Flow::Continue;
        }
        warn!(worker = self.worker, seed = %seed, depth, "accepting cycle");
        self.after_violation()
    }

    fn report_overflow(&self, position: &P) -> Flow {
        let limit = self.ctx.settings().max_stack_depth;
        if position.is_fingerprinted() {
            let claimed = self.ctx.live().try_claim(
                position.key(),
                LiveState::retired(position.bounds().depth_i32(), position.magic_bit()),
            );
            if !claimed {
                return Flow::Continue;
            }
        }
        warn!(worker = self.worker, limit, state = %position.fingerprint(), "local stack overflow");
        self.ctx.violations().record_safety(ViolationTrace {
            kind: ViolationKind::StackOverflow { limit },
            states: position.trace(),
            worker: Some(self.worker),
            iteration: self.ctx.iteration(),
        });
        self.after_violation()
    }

    fn after_violation(&self) -> Flow {
        if self.ctx.settings().stop_on_first_error {
            self.ctx.cancel_token().cancel(CancelReason::Violation);
            Flow::Canceled
        } else {
            Flow::Continue
        }
    }
}
