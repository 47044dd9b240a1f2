//! Scheduler Types
//!
//! Identifiers and lifecycle states shared by every delaying scheduler.
//!
//! # Process Lifecycle
//!
//! ```text
//! start ──> RUNNABLE ──────> BLOCKED    (on_blocked)
//!              ↑                │
//!              └────────────────┘        (on_enabled)
//!
//!           RUNNABLE ──────> COMPLETED  (finish)
//! ```

use std::fmt;

/// Process identifier
///
/// # Example
///
/// ```rust
/// use krepis_crunch::domain::scheduler::ProcessId;
///
/// let p0 = ProcessId::new(0);
/// let p1 = ProcessId::new(1);
///
/// assert_ne!(p0, p1);
/// assert_eq!(format!("{}", p1), "Process(1)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// Create a new ProcessId
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw numeric ID
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// Process state as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Eligible to be chosen by `next`
    Runnable,

    /// Waiting on a resource; skipped by `next` until re-enabled
    Blocked,

    /// Finished; never scheduled again
    Completed,
}

impl ProcessState {
    /// Check if process can be scheduled
    #[inline(always)]
    pub const fn is_runnable(self) -> bool {
        matches!(self, ProcessState::Runnable)
    }

    /// Check if process is blocked
    #[inline(always)]
    pub const fn is_blocked(self) -> bool {
        matches!(self, ProcessState::Blocked)
    }

    /// Check if process is completed
    #[inline(always)]
    pub const fn is_completed(self) -> bool {
        matches!(self, ProcessState::Completed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Runnable => write!(f, "RUNNABLE"),
            ProcessState::Blocked => write!(f, "BLOCKED"),
            ProcessState::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Error type for scheduler operations
///
/// Each variant is a precondition the transition collaborator violated when
/// driving the scheduler. None of them reach the search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Process was never started
    UnknownProcess {
        /// Offending process
        process: ProcessId,
    },

    /// Process was started twice
    AlreadyStarted {
        /// Offending process
        process: ProcessId,
        /// State it is already in
        current_state: ProcessState,
    },

    /// Process is not in a valid state for the requested operation
    InvalidProcessState {
        /// Offending process
        process: ProcessId,
        /// State it is in
        current_state: ProcessState,
        /// State the operation requires
        expected_state: ProcessState,
    },

    /// Custom operation name not understood by this policy
    UnknownOperation {
        /// Operation name as given
        name: String,
    },

    /// Custom operation called with the wrong arguments
    InvalidArguments {
        /// Operation name
        name: String,
        /// Arguments the operation takes
        expected: usize,
        /// Arguments supplied
        got: usize,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::UnknownProcess { process } => {
                write!(f, "{} was never started", process)
            }
            SchedulerError::AlreadyStarted {
                process,
                current_state,
            } => write!(f, "{} already started (state {})", process, current_state),
            SchedulerError::InvalidProcessState {
                process,
                current_state,
                expected_state,
            } => write!(
                f,
                "{} is in state {}, expected {}",
                process, current_state, expected_state
            ),
            SchedulerError::UnknownOperation { name } => {
                write!(f, "Unknown scheduler operation: {}", name)
            }
            SchedulerError::InvalidArguments { name, expected, got } => write!(
                f,
                "Operation {} takes {} arguments, got {}",
                name, expected, got
            ),
        }
    }
}

impl std::error::Error for SchedulerError {}
