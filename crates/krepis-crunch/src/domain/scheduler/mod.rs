//! Delaying Schedulers
//!
//! Scheduler-driven models decide which process runs next by asking a
//! pluggable policy. Deviating from the policy's choice costs one *delay*;
//! searching in [`BoundMode::Delay`](crate::BoundMode::Delay) bounds the number
//! of such deviations instead of the path length.
//!
//! The policy lives inside the model's state (it is cloned with every
//! position and must be hashed into the fingerprint). The search engine never
//! calls it directly; it only sees the delay count in each position's
//! [`Bounds`](crate::Bounds).
//!
//! # Example
//!
//! ```rust
//! use krepis_crunch::domain::scheduler::{DelayingScheduler, ProcessId, RoundRobinScheduler};
//!
//! let mut sched = RoundRobinScheduler::new(1);
//! sched.start(ProcessId::new(0)).unwrap();
//! sched.start(ProcessId::new(1)).unwrap();
//!
//! assert_eq!(sched.next(), Some(ProcessId::new(0)));
//! assert!(sched.delay());
//! assert_eq!(sched.next(), Some(ProcessId::new(1)));
//! assert!(sched.max_delay_reached());
//! ```

pub mod round_robin;
pub mod types;

pub use round_robin::RoundRobinScheduler;
pub use types::{ProcessId, ProcessState, SchedulerError};

/// Scheduling policy with a bounded number of deviations
pub trait DelayingScheduler: Clone + Send + Sync {
    /// Register a newly created process
    fn start(&mut self, process: ProcessId) -> Result<(), SchedulerError>;

    /// Retire a process for good
    fn finish(&mut self, process: ProcessId) -> Result<(), SchedulerError>;

    /// Skip the process the policy would choose next
    ///
    /// Returns `false` without changing anything when the delay budget is
    /// spent or nothing is runnable.
    fn delay(&mut self) -> bool;

    /// Process the policy chooses, if any is runnable
    fn next(&self) -> Option<ProcessId>;

    /// Whether the delay budget is spent
    fn max_delay_reached(&self) -> bool;

    /// Process stopped being runnable
    fn on_blocked(&mut self, process: ProcessId) -> Result<(), SchedulerError>;

    /// Process became runnable again
    fn on_enabled(&mut self, process: ProcessId) -> Result<(), SchedulerError>;

    /// Policy-specific named operation
    fn invoke(&mut self, operation: &str, args: &[i64]) -> Result<(), SchedulerError>;
}
