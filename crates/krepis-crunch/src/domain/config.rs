//! Search Configuration
//!
//! [`CrunchConfig`] is plain data: serializable, defaulted, and checked once
//! by [`CrunchConfig::validate`] before a search starts.
//!
//! # Example
//!
//! ```rust
//! use krepis_crunch::{BoundMode, CrunchConfig};
//!
//! let config = CrunchConfig::builder()
//!     .workers(4)
//!     .bound_mode(BoundMode::Depth)
//!     .max_cutoff(32)
//!     .liveness(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.workers, 4);
//! ```

use crate::domain::bounds::{BoundMode, CutoffSchedule};
use crate::domain::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ceiling on the local DFS stack
pub const DEFAULT_MAX_STACK_DEPTH: usize = 100_000;

/// Default number of entries moved per steal
pub const DEFAULT_STEAL_BATCH: usize = 16;

/// Default progress callback interval in milliseconds
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1_000;

/// Random-walk liveness probe settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomWalkConfig {
    /// Steps per walk
    pub max_steps: u32,
    /// Steps without an accepting state after which a cycle is suspected
    pub stall_bound: u32,
    /// Frontier entries probed per iteration
    pub samples: usize,
    /// Base RNG seed, combined with the iteration number
    pub seed: u64,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            stall_bound: 1_000,
            samples: 8,
            seed: 0x6b72_6570_6973,
        }
    }
}

/// Disk-backed frontier settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskFrontierConfig {
    /// Directory holding `frontier-<w>.in` / `frontier-<w>.out`
    pub directory: PathBuf,
    /// Entries per block
    pub block_size: usize,
    /// Blocks buffered in each bounded queue
    pub queue_capacity: usize,
}

impl DiskFrontierConfig {
    /// Settings with default block size and queue capacity
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            block_size: 256,
            queue_capacity: 8,
        }
    }
}

/// Top-level search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrunchConfig {
    /// Degree of parallelism
    pub workers: usize,
    /// Active bound axis
    pub bound_mode: BoundMode,
    /// Cutoff growth schedule
    pub schedule: CutoffSchedule,
    /// Cutoff ceiling
    pub max_cutoff: Option<u32>,
    /// Global choice-cost ceiling
    pub max_choice_cost: Option<u32>,
    /// Cancel the search at the first violation
    pub stop_on_first_error: bool,
    /// Nested-DFS accepting-cycle search
    pub liveness: bool,
    /// Random-walk liveness probe
    pub random_walk: Option<RandomWalkConfig>,
    /// Local DFS stack ceiling
    pub max_stack_depth: usize,
    /// Entries moved per steal
    pub steal_batch: usize,
    /// Progress callback interval
    pub progress_interval_ms: u64,
    /// Spill the frontier to disk
    pub disk: Option<DiskFrontierConfig>,
}

impl Default for CrunchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            bound_mode: BoundMode::Depth,
            schedule: CutoffSchedule::default(),
            max_cutoff: None,
            max_choice_cost: None,
            stop_on_first_error: true,
            liveness: false,
            random_walk: None,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            steal_batch: DEFAULT_STEAL_BATCH,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            disk: None,
        }
    }
}

impl CrunchConfig {
    /// Start a builder from defaults
    pub fn builder() -> CrunchConfigBuilder {
        CrunchConfigBuilder::new()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SearchResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SearchError::InvalidConfig(format!("malformed JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SearchError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> SearchResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SearchError::Internal(format!("config serialization failed: {e}")))
    }

    /// Progress callback interval
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Random-walk settings, if the probe runs at all (it needs `liveness`)
    pub fn active_random_walk(&self) -> Option<&RandomWalkConfig> {
        self.random_walk.as_ref().filter(|_| self.liveness)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> SearchResult<()> {
        let invalid = |msg: &str| Err(SearchError::InvalidConfig(msg.to_string()));

        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.max_stack_depth == 0 {
            return invalid("max_stack_depth must be at least 1");
        }
        match &self.schedule {
            CutoffSchedule::Linear { step: 0, .. } => {
                return invalid("linear schedule step must be positive");
            }
            CutoffSchedule::Explicit(values) if values.is_empty() => {
                return invalid("explicit schedule must not be empty");
            }
            CutoffSchedule::Explicit(values) if values.windows(2).any(|w| w[1] <= w[0]) => {
                return invalid("explicit schedule must be strictly increasing");
            }
            _ => {}
        }
        if let Some(walk) = &self.random_walk {
            if walk.samples == 0 || walk.max_steps == 0 {
                return invalid("random walk needs at least one sample and one step");
            }
        }
        if let Some(disk) = &self.disk {
            if disk.block_size == 0 {
                return invalid("disk block_size must be at least 1");
            }
            if disk.queue_capacity == 0 {
                return invalid("disk queue_capacity must be at least 1");
            }
        }
        Ok(())
    }
}

/// Fluent constructor for [`CrunchConfig`]
///
/// ```rust
/// use krepis_crunch::{CrunchConfigBuilder, CutoffSchedule};
///
/// let config = CrunchConfigBuilder::new()
///     .workers(2)
///     .schedule(CutoffSchedule::Explicit(vec![4, 8, 16]))
///     .stop_on_first_error(false)
///     .build()
///     .unwrap();
///
/// assert!(!config.stop_on_first_error);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrunchConfigBuilder {
    config: CrunchConfig,
}

impl CrunchConfigBuilder {
    /// Create new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set degree of parallelism
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the bound axis
    pub fn bound_mode(mut self, mode: BoundMode) -> Self {
        self.config.bound_mode = mode;
        self
    }

    /// Set the cutoff schedule
    pub fn schedule(mut self, schedule: CutoffSchedule) -> Self {
        self.config.schedule = schedule;
        self
    }

    /// Set the cutoff ceiling
    pub fn max_cutoff(mut self, max: u32) -> Self {
        self.config.max_cutoff = Some(max);
        self
    }

    /// Set the global choice-cost ceiling
    pub fn max_choice_cost(mut self, max: u32) -> Self {
        self.config.max_choice_cost = Some(max);
        self
    }

    /// Cancel at the first violation, or keep collecting
    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.config.stop_on_first_error = stop;
        self
    }

    /// Enable nested-DFS accepting-cycle search
    pub fn liveness(mut self, enable: bool) -> Self {
        self.config.liveness = enable;
        self
    }

    /// Enable the random-walk probe
    pub fn random_walk(mut self, walk: RandomWalkConfig) -> Self {
        self.config.random_walk = Some(walk);
        self
    }

    /// Set the local stack ceiling
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.config.max_stack_depth = depth;
        self
    }

    /// Set the steal batch size
    pub fn steal_batch(mut self, batch: usize) -> Self {
        self.config.steal_batch = batch;
        self
    }

    /// Set the progress callback interval
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Spill the frontier to disk
    pub fn disk(mut self, disk: DiskFrontierConfig) -> Self {
        self.config.disk = Some(disk);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> SearchResult<CrunchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
