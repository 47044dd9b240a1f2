//! Disk-Backed Frontier Pipeline
//!
//! Same iteration loop as the in-memory driver, but the frontier between
//! iterations lives in per-worker files. Each iteration runs three stages
//! connected by bounded channels:
//!
//! ```text
//!  frontier-*.in ──> reader ──(entry batches)──> worker 0..N ──(blocks)──> writer ──> frontier-*.out
//!                    1 thread    bounded(q)      Walker each    bounded(q)  1 thread
//! ```
//!
//! Workers pull batches from a shared queue, which replaces work stealing.
//! The next frontier is never resident, so entries read back are not checked
//! against it; duplicates emitted within one iteration are dropped by
//! frontier key, keeping the first.
//!
//! With the random-walk probe enabled, the first `samples` entries of the
//! rotated input files are decoded at each iteration boundary and probed,
//! as the in-memory driver does with its drained frontier.

use crate::domain::bounds::{BoundController, Cutoff};
use crate::domain::config::{CrunchConfig, DiskFrontierConfig};
use crate::domain::engine::{
    controller_for, finish_report, probe_boundary, progress_snapshot, request_cancel_if,
    root_entry, supervise,
};
use crate::domain::error::{SearchError, SearchResult};
use crate::domain::explore::worker::{Flow, Walker, WorkerExit, WorkerSummary};
use crate::domain::explore::{FrontierSink, SearchContext, WalkSettings};
use crate::domain::frontier::{FrontierEntry, FrontierKey, FrontierSet};
use crate::domain::model::{Model, PositionCodec, TraversalPosition};
use crate::domain::report::{CrunchReport, ProgressControl, ProgressSnapshot};
use crate::infrastructure::{decode_block, encode_block, BlockWriter, FrontierFiles};
use crossbeam_channel::{Receiver, Sender};
use dashmap::DashSet;
use std::fs::File;
use std::io::BufWriter;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Deferred entries on their way to the writer
struct FrontierBlock<P> {
    owner: usize,
    entries: Vec<FrontierEntry<P>>,
}

/// Sink that batches deferred entries into blocks for the writer stage
struct SpillSink<'a, P> {
    owner: usize,
    emitted: &'a DashSet<FrontierKey>,
    block: Vec<FrontierEntry<P>>,
    block_size: usize,
    out: Sender<FrontierBlock<P>>,
}

impl<P> SpillSink<'_, P> {
    fn flush(&mut self) -> SearchResult<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let entries = std::mem::replace(&mut self.block, Vec::with_capacity(self.block_size));
        self.out
            .send(FrontierBlock {
                owner: self.owner,
                entries,
            })
            .map_err(|_| SearchError::Internal("frontier writer stopped".to_string()))
    }
}

impl<P> FrontierSink<P> for SpillSink<'_, P> {
    fn resident(&self) -> Option<&FrontierSet<P>> {
        None
    }

    fn offer(&mut self, entry: FrontierEntry<P>) -> SearchResult<()> {
        if !self.emitted.insert(entry.frontier_key()) {
            return Ok(());
        }
        self.block.push(entry);
        if self.block.len() >= self.block_size {
            self.flush()?;
        }
        Ok(())
    }
}

/// Iteration driver over a spilled frontier
pub(crate) struct DiskPipeline<'a, M> {
    model: &'a M,
    config: &'a CrunchConfig,
    disk: &'a DiskFrontierConfig,
}

impl<'a, M> DiskPipeline<'a, M>
where
    M: Model + PositionCodec<M::Position>,
{
    pub(crate) fn new(model: &'a M, config: &'a CrunchConfig, disk: &'a DiskFrontierConfig) -> Self {
        Self { model, config, disk }
    }

    pub(crate) fn run<F>(&self, mut progress: F) -> SearchResult<CrunchReport>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        let started = Instant::now();
        let ctx = SearchContext::new(WalkSettings::from(self.config));
        let files = FrontierFiles::create(&self.disk.directory, self.config.workers)?;
        let mut controller = controller_for(self.config);

        info!(
            workers = self.config.workers,
            mode = ?self.config.bound_mode,
            directory = %self.disk.directory.display(),
            block_size = self.disk.block_size,
            "spilling search started"
        );

        let iterated = self.iterate(&ctx, &files, &mut controller, started, &mut progress);
        if let Err(err) = files.clear() {
            warn!(error = %err, "could not remove frontier files");
        }
        let bound_exhausted = iterated?;
        Ok(finish_report(&ctx, &controller, bound_exhausted, started))
    }

    /// Iteration loop; returns whether the cutoff ceiling stopped the search
    fn iterate<F>(
        &self,
        ctx: &SearchContext<M::Position>,
        files: &FrontierFiles,
        controller: &mut BoundController,
        started: Instant,
        progress: &mut F,
    ) -> SearchResult<bool>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        let mut root = Some(root_entry(self.model, ctx));
        loop {
            let cutoff = controller.cutoff();
            ctx.set_iteration(controller.iteration());

            let written = self.run_iteration(ctx, files, root.take(), cutoff, started, progress)?;
            files.rotate()?;
            ctx.fold();
            ctx.stats().record_iteration();

            if let Some(walk) = self.config.active_random_walk() {
                let sample = sample_frontier(self.model, files, walk.samples)?;
                probe_boundary(ctx, self.config, walk, &sample, controller.iteration());
            }

            let snapshot = progress_snapshot(ctx, controller, written as usize, started);
            info!(
                iteration = snapshot.iteration,
                cutoff = snapshot.cutoff,
                states = snapshot.states_explored,
                distinct = snapshot.distinct_states,
                spilled = written,
                "iteration finished"
            );
            request_cancel_if(ctx, progress(&snapshot));

            if ctx.cancel_token().is_canceled() {
                return Ok(false);
            }
            if controller.is_complete(written as usize) {
                return Ok(written > 0);
            }
            controller.advance();
        }
    }

    /// Run reader, workers and writer for one cutoff; returns entries spilled
    fn run_iteration<F>(
        &self,
        ctx: &SearchContext<M::Position>,
        files: &FrontierFiles,
        root: Option<FrontierEntry<M::Position>>,
        cutoff: Cutoff,
        started: Instant,
        progress: &mut F,
    ) -> SearchResult<u64>
    where
        F: FnMut(&ProgressSnapshot) -> ProgressControl,
    {
        let workers = self.config.workers;
        let emitted: DashSet<FrontierKey> = DashSet::new();
        let outputs = files.create_outputs()?;
        let (entry_tx, entry_rx) = crossbeam_channel::bounded(self.disk.queue_capacity);
        let (block_tx, block_rx) = crossbeam_channel::bounded(self.disk.queue_capacity);
        let (done_tx, done_rx) = crossbeam_channel::bounded(workers);

        thread::scope(|scope| -> SearchResult<u64> {
            let reader = scope.spawn(move || read_stage(self.model, ctx, files, root, entry_tx));
            let writer = scope.spawn(move || write_stage(self.model, outputs, block_rx));

            for worker in 0..workers {
                let entries = entry_rx.clone();
                let sink = SpillSink {
                    owner: worker,
                    emitted: &emitted,
                    block: Vec::with_capacity(self.disk.block_size),
                    block_size: self.disk.block_size,
                    out: block_tx.clone(),
                };
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        work_stage(Walker::new(worker, ctx, cutoff), entries, sink)
                    }));
                    let _ = done_tx.send((worker, outcome));
                });
            }
            drop(entry_rx);
            drop(block_tx);
            drop(done_tx);

            let supervised = supervise(
                ctx,
                &done_rx,
                workers,
                self.config.progress_interval(),
                || ProgressSnapshot {
                    iteration: ctx.iteration(),
                    cutoff: cutoff.value,
                    states_explored: ctx.stats().states_explored(),
                    distinct_states: ctx.distinct_states_seen(),
                    frontier_size: emitted.len() as u64,
                    elapsed: started.elapsed(),
                },
                progress,
            );

            let read = reader
                .join()
                .map_err(|_| SearchError::Internal("frontier reader panicked".to_string()))?;
            let written = writer
                .join()
                .map_err(|_| SearchError::Internal("frontier writer panicked".to_string()))?;
            let read = read?;
            let written = written?;
            supervised?;

            debug!(iteration = ctx.iteration(), read, written, "frontier pipeline drained");
            Ok(written)
        })
    }
}

fn read_stage<M>(
    codec: &M,
    ctx: &SearchContext<M::Position>,
    files: &FrontierFiles,
    root: Option<FrontierEntry<M::Position>>,
    out: Sender<Vec<FrontierEntry<M::Position>>>,
) -> SearchResult<u64>
where
    M: Model + PositionCodec<M::Position>,
{
    let mut read = 0u64;
    if let Some(root) = root {
        if out.send(vec![root]).is_err() {
            return Ok(0);
        }
        read += 1;
    }

    for worker in 0..files.workers() {
        let Some(mut reader) = files.open_input(worker)? else {
            continue;
        };
        while let Some((header, body)) = reader.next_block()? {
            if ctx.cancel_token().is_canceled() {
                return Ok(read);
            }
            let entries = decode_block(header, &body, codec)?;
            read += entries.len() as u64;
            // every worker gone: nothing left to feed
            if out.send(entries).is_err() {
                return Ok(read);
            }
        }
        trace!(worker, read, "frontier input consumed");
    }
    Ok(read)
}

/// Decode up to `limit` entries queued in the input files, in file order
fn sample_frontier<M>(
    codec: &M,
    files: &FrontierFiles,
    limit: usize,
) -> SearchResult<Vec<FrontierEntry<M::Position>>>
where
    M: Model + PositionCodec<M::Position>,
{
    let mut sample = Vec::new();
    for worker in 0..files.workers() {
        if sample.len() >= limit {
            break;
        }
        let Some(mut reader) = files.open_input(worker)? else {
            continue;
        };
        while sample.len() < limit {
            let Some((header, body)) = reader.next_block()? else {
                break;
            };
            sample.extend(decode_block(header, &body, codec)?);
        }
    }
    sample.truncate(limit);
    Ok(sample)
}

fn work_stage<P: TraversalPosition>(
    mut walker: Walker<'_, P>,
    entries: Receiver<Vec<FrontierEntry<P>>>,
    mut sink: SpillSink<'_, P>,
) -> SearchResult<WorkerSummary> {
    for batch in entries {
        for entry in batch {
            if walker.process_entry(entry, &mut sink)? == Flow::Canceled {
                sink.flush()?;
                return Ok(walker.summary(WorkerExit::Canceled));
            }
        }
    }
    sink.flush()?;
    Ok(walker.summary(WorkerExit::Drained))
}

fn write_stage<M>(
    codec: &M,
    mut outputs: Vec<BlockWriter<BufWriter<File>>>,
    blocks: Receiver<FrontierBlock<M::Position>>,
) -> SearchResult<u64>
where
    M: Model + PositionCodec<M::Position>,
{
    let files = outputs.len().max(1);
    for block in blocks {
        let bytes = encode_block(&block.entries, codec)?;
        outputs[block.owner % files].write_block(&bytes)?;
    }
    let mut written = 0;
    for output in outputs {
        let (_, entries) = output.finish()?;
        written += entries;
    }
    Ok(written)
}
