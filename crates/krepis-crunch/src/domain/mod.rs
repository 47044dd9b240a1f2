//! Domain Layer
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Model Contract              Bounds                         │
//! │  ├─ Model                    ├─ BoundMode (depth / delay)   │
//! │  ├─ TraversalPosition        ├─ CutoffSchedule              │
//! │  └─ PositionCodec            └─ BoundController             │
//! │                                                             │
//! │  State Tables                Frontier                       │
//! │  ├─ DeadStateTable           ├─ FrontierSet (dominance)     │
//! │  └─ LiveStateTable           └─ Partitions (work stealing)  │
//! │                                                             │
//! │  Explore                     Engine                         │
//! │  ├─ must_explore             └─ Crunch (iteration loop)     │
//! │  ├─ Walker (nested DFS)                                     │
//! │  └─ random-walk probe        Scheduler                      │
//! │                              └─ DelayingScheduler           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bounds;
pub mod config;
pub mod engine;
pub mod error;
pub mod explore;
pub mod frontier;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod state;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod testing;

pub use bounds::{BoundController, BoundMode, Cutoff, CutoffSchedule};
pub use config::{CrunchConfig, CrunchConfigBuilder, DiskFrontierConfig, RandomWalkConfig};
pub use engine::Crunch;
pub use error::{SearchError, SearchResult};
pub use explore::{CancelReason, CancellationToken, Decision, SearchContext, WalkSettings};
pub use frontier::{FrontierEntry, FrontierInsert, FrontierKey, FrontierSet, Partitions};
pub use model::{Model, PositionCodec, PositionStatus, TraversalPosition};
pub use report::{
    CrunchReport, Outcome, ProgressControl, ProgressSnapshot, StatsSnapshot, ViolationKind,
    ViolationTrace,
};
pub use scheduler::{DelayingScheduler, ProcessId, ProcessState, RoundRobinScheduler, SchedulerError};
pub use state::{Bounds, DeadState, Fingerprint, LiveState, StateKey};
