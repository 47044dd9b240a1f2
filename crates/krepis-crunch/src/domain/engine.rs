//! Crunch Driver
//!
//! Runs iterative deepening over the model:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ loop                                                           │
//! │   partition frontier ──> N scoped workers ──> join (supervised)│
//! │   fold live → dead                                             │
//! │   drain next frontier, optional random-walk probe              │
//! │   progress callback                                            │
//! │   stop if canceled / frontier empty / cutoff at ceiling        │
//! │   advance cutoff                                               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While workers run, the driver thread waits on their completion channel
//! with a timeout equal to the progress interval and calls the progress
//! callback on every timeout.

use crate::adapters::disk_pipeline::DiskPipeline;
use crate::domain::bounds::{BoundController, Cutoff};
use crate::domain::config::{CrunchConfig, RandomWalkConfig};
use crate::domain::error::{SearchError, SearchResult};
use crate::domain::explore::random_walk::probe_frontier;
use crate::domain::explore::worker::{Walker, WorkerSummary};
use crate::domain::explore::{CancelReason, SearchContext, WalkSettings};
use crate::domain::frontier::{FrontierEntry, Partitions};
use crate::domain::model::{Model, PositionCodec, TraversalPosition};
use crate::domain::report::{CrunchReport, Outcome, ProgressControl, ProgressSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What a worker thread hands back on exit
pub(crate) type WorkerOutcome = thread::Result<SearchResult<WorkerSummary>>;

/// Parallel bounded search over a model
///
/// # Example
///
/// ```rust,ignore
/// use krepis_crunch::{Crunch, CrunchConfig, Outcome};
///
/// let config = CrunchConfig::builder().workers(4).max_cutoff(20).build()?;
/// let report = Crunch::new(&model, config)?.crunch()?;
/// assert_eq!(report.outcome, Outcome::Success);
/// ```
pub struct Crunch<'m, M> {
    model: &'m M,
    config: CrunchConfig,
}

impl<'m, M: Model> Crunch<'m, M> {
    /// Validate `config` and bind it to `model`
    pub fn new(model: &'m M, config: CrunchConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Configuration in force
    pub fn config(&self) -> &CrunchConfig {
        &self.config
    }

    /// Search without progress reporting
    pub fn crunch(&self) -> SearchResult<CrunchReport> {
        self.crunch_with_progress(|_| ProgressControl::Continue)
    }

    /// Search, calling `progress` periodically and at iteration boundaries
    ///
    /// Returning [`ProgressControl::Cancel`] stops the search; the report then
    /// carries [`Outcome::Canceled`] (unless a violation was already found)
    /// and the statistics gathered so far.
    pub fn crunch_with_progress<F>(&self, progress: F) -> SearchResult<CrunchReport>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        if self.config.disk.is_some() {
            return Err(SearchError::InvalidConfig(
                "disk frontier needs a position codec; use crunch_spilling".to_string(),
            ));
        }
        let ctx = SearchContext::new(WalkSettings::from(&self.config));
        self.search(&ctx, progress)
    }

    pub(crate) fn search<F>(
        &self,
        ctx: &SearchContext<M::Position>,
        mut progress: F,
    ) -> SearchResult<CrunchReport>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        let started = Instant::now();
        let mut controller = controller_for(&self.config);
        let mut frontier = vec![root_entry(self.model, ctx)];

        info!(
            workers = self.config.workers,
            mode = ?self.config.bound_mode,
            liveness = self.config.liveness,
            "search started"
        );

        let bound_exhausted = loop {
            let cutoff = controller.cutoff();
            ctx.set_iteration(controller.iteration());

            let partitions =
                Partitions::distribute(frontier, self.config.workers, self.config.steal_batch);
            self.run_iteration(ctx, &partitions, cutoff, started, &mut progress)?;

            ctx.fold();
            ctx.stats().record_iteration();
            frontier = ctx.next_frontier().drain();

            if let Some(walk) = self.config.active_random_walk() {
                probe_boundary(ctx, &self.config, walk, &frontier, controller.iteration());
            }

            let snapshot = progress_snapshot(ctx, &controller, frontier.len(), started);
            info!(
                iteration = snapshot.iteration,
                cutoff = snapshot.cutoff,
                states = snapshot.states_explored,
                distinct = snapshot.distinct_states,
                frontier = snapshot.frontier_size,
                "iteration finished"
            );
            request_cancel_if(ctx, progress(&snapshot));

            if ctx.cancel_token().is_canceled() {
                break false;
            }
            if controller.is_complete(frontier.len()) {
                break !frontier.is_empty();
            }
            controller.advance();
        };

        Ok(finish_report(ctx, &controller, bound_exhausted, started))
    }

    fn run_iteration<F>(
        &self,
        ctx: &SearchContext<M::Position>,
        partitions: &Partitions<M::Position>,
        cutoff: Cutoff,
        started: Instant,
        progress: &mut F,
    ) -> SearchResult<()>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        let workers = partitions.workers();
        let (done_tx, done_rx) = crossbeam_channel::bounded(workers);

        thread::scope(|scope| {
            for worker in 0..workers {
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        Walker::new(worker, ctx, cutoff).run_partition(partitions)
                    }));
                    let _ = done_tx.send((worker, outcome));
                });
            }
            drop(done_tx);

            supervise(
                ctx,
                &done_rx,
                workers,
                self.config.progress_interval(),
                || ProgressSnapshot {
                    iteration: ctx.iteration(),
                    cutoff: cutoff.value,
                    states_explored: ctx.stats().states_explored(),
                    distinct_states: ctx.distinct_states_seen(),
                    frontier_size: ctx.next_frontier().len() as u64,
                    elapsed: started.elapsed(),
                },
                progress,
            )
        })
    }
}

impl<'m, M> Crunch<'m, M>
where
    M: Model + PositionCodec<M::Position>,
{
    /// Search with the frontier spilled to disk when configured
    ///
    /// Falls back to the in-memory search when `config.disk` is `None`.
    pub fn crunch_spilling<F>(&self, progress: F) -> SearchResult<CrunchReport>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        match &self.config.disk {
            Some(disk) => DiskPipeline::new(self.model, &self.config, disk).run(progress),
            None => self.crunch_with_progress(progress),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared Driver Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn controller_for(config: &CrunchConfig) -> BoundController {
    BoundController::new(
        config.bound_mode,
        config.schedule.clone(),
        config.max_cutoff,
        config.max_choice_cost,
    )
}

/// Wait for `workers` completions, calling `progress` on every timeout
///
/// The first worker failure cancels the remaining workers and is returned
/// once all of them have exited.
pub(crate) fn supervise<P, S, F>(
    ctx: &SearchContext<P>,
    done: &Receiver<(usize, WorkerOutcome)>,
    workers: usize,
    interval: Duration,
    mut snapshot: S,
    progress: &mut F,
) -> SearchResult<()>
where
    P: Clone,
    S: FnMut() -> ProgressSnapshot,
    F: FnMut(&ProgressSnapshot) -> ProgressControl,
{
    let mut finished = 0;
    let mut failure: Option<SearchError> = None;

    while finished < workers {
        match done.recv_timeout(interval) {
            Ok((worker, outcome)) => {
                finished += 1;
                if let Err(err) = settle(worker, outcome) {
                    warn!(worker, category = err.category(), error = %err, "worker failed");
                    ctx.cancel_token().cancel(CancelReason::Failure);
                    failure.get_or_insert(err);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !ctx.cancel_token().is_canceled() {
                    request_cancel_if(ctx, progress(&snapshot()));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    failure.map_or(Ok(()), Err)
}

fn settle(worker: usize, outcome: WorkerOutcome) -> SearchResult<WorkerSummary> {
    match outcome {
        Ok(result) => result,
        Err(payload) => Err(SearchError::WorkerPanicked {
            worker,
            reason: panic_reason(payload.as_ref()),
        }),
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) fn request_cancel_if<P: Clone>(ctx: &SearchContext<P>, control: ProgressControl) {
    if control == ProgressControl::Cancel && !ctx.cancel_token().is_canceled() {
        warn!(iteration = ctx.iteration(), "search canceled by caller");
        ctx.cancel_token().cancel(CancelReason::Requested);
    }
}

/// Random-walk probe at an iteration boundary
///
/// A finding cancels the search when `stop_on_first_error` is set.
pub(crate) fn probe_boundary<P: TraversalPosition>(
    ctx: &SearchContext<P>,
    config: &CrunchConfig,
    walk: &RandomWalkConfig,
    entries: &[FrontierEntry<P>],
    iteration: u32,
) {
    let found = probe_frontier(entries, walk, iteration, ctx.violations());
    if found > 0 && config.stop_on_first_error {
        ctx.cancel_token().cancel(CancelReason::Violation);
    }
}

pub(crate) fn progress_snapshot<P: Clone>(
    ctx: &SearchContext<P>,
    controller: &BoundController,
    frontier_size: usize,
    started: Instant,
) -> ProgressSnapshot {
    ProgressSnapshot {
        iteration: controller.iteration(),
        cutoff: controller.cutoff().value,
        states_explored: ctx.stats().states_explored(),
        distinct_states: ctx.distinct_states_seen(),
        frontier_size: frontier_size as u64,
        elapsed: started.elapsed(),
    }
}

pub(crate) fn finish_report<P: Clone>(
    ctx: &SearchContext<P>,
    controller: &BoundController,
    bound_exhausted: bool,
    started: Instant,
) -> CrunchReport {
    let (safety_traces, liveness_traces) = ctx.violations().snapshot();
    let outcome = if !safety_traces.is_empty() {
        Outcome::SafetyViolation
    } else if !liveness_traces.is_empty() {
        Outcome::LivenessViolation
    } else if ctx.cancel_token().reason() == Some(CancelReason::Requested) {
        Outcome::Canceled
    } else {
        Outcome::Success
    };

    let report = CrunchReport {
        outcome,
        safety_traces,
        liveness_traces,
        stats: ctx.stats().snapshot(),
        distinct_states: ctx.dead().distinct_states() as u64,
        final_cutoff: controller.cutoff().value,
        bound_exhausted,
        elapsed: started.elapsed(),
    };
    info!(
        outcome = %report.outcome,
        iterations = report.stats.iterations,
        states = report.stats.states_explored,
        distinct = report.distinct_states,
        bound_exhausted,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "search finished"
    );
    report
}

/// Root entry used by both frontier representations
pub(crate) fn root_entry<M: Model>(model: &M, ctx: &SearchContext<M::Position>) -> FrontierEntry<M::Position> {
    FrontierEntry::from_position(model.initial_position(), ctx.next_ordinal(), 0, None)
}
