//! Krepis Crunch - Parallel Bounded State-Space Explorer
//!
//! # Overview
//!
//! `krepis-crunch` exhaustively explores the reachable states of a
//! concurrent or event-driven model up to an iteratively deepened bound,
//! reporting safety violations (erroneous states) and liveness violations
//! (accepting cycles) with the trace that reaches them.
//!
//! The model is external: it supplies an initial [`TraversalPosition`] and
//! the position yields its successors one at a time. The engine never
//! inspects state contents, only fingerprints and bounds.
//!
//! # Trinity Architecture
//!
//! - **Domain**: state tables, frontier, bound controller, the DFS worker,
//!   nested-DFS liveness and the in-memory driver
//! - **Infrastructure**: block codec and per-worker frontier files
//! - **Adapters**: the disk-backed reader / worker / writer pipeline
//!
//! # Search Laws (Invariants)
//!
//! - A fingerprint is in at most one of the dead table, live table and
//!   frontier at any instant
//! - A frontier entry is only replaced by one whose bound is no shallower
//! - An erroneous state is reported at most once per run
//! - Worker count changes wall-clock time, never the verdict
//!
//! # Usage
//!
//! ```rust,ignore
//! use krepis_crunch::{Crunch, CrunchConfig, Outcome, ProgressControl};
//!
//! let config = CrunchConfig::builder()
//!     .workers(8)
//!     .max_cutoff(64)
//!     .liveness(true)
//!     .build()?;
//!
//! let report = Crunch::new(&model, config)?.crunch_with_progress(|snapshot| {
//!     println!("iteration {} at cutoff {}", snapshot.iteration, snapshot.cutoff);
//!     ProgressControl::Continue
//! })?;
//!
//! if report.outcome != Outcome::Success {
//!     for trace in &report.safety_traces {
//!         println!("{:?}: {} steps", trace.kind, trace.len());
//!     }
//! }
//! ```
//!
//! Models that also implement [`PositionCodec`] can spill the frontier to
//! disk with [`Crunch::crunch_spilling`] and a [`DiskFrontierConfig`].

#![warn(missing_docs)]

// Lets the shared test models under tests/common name this crate by path.
#[cfg(test)]
extern crate self as krepis_crunch;

pub mod adapters;
pub mod domain;
pub mod infrastructure;

pub use domain::{
    BoundMode, Bounds, Crunch, CrunchConfig, CrunchConfigBuilder, CrunchReport, Cutoff,
    CutoffSchedule, DelayingScheduler, DiskFrontierConfig, Fingerprint, Model, Outcome,
    PositionCodec, PositionStatus, ProcessId, ProgressControl, ProgressSnapshot,
    RandomWalkConfig, RoundRobinScheduler, SearchError, SearchResult, StateKey, StatsSnapshot,
    TraversalPosition, ViolationKind, ViolationTrace,
};
pub use infrastructure::StorageError;

/// Library version
pub const KREPIS_CRUNCH_VERSION: &str = env!("CARGO_PKG_VERSION");
