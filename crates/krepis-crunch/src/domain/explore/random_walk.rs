//! Random-Walk Liveness Probe
//!
//! A cheap, unsound complement to nested DFS for models too large to search
//! exhaustively. From a frontier position, follow uniformly random successors
//! for up to `max_steps` steps. Once the walk has seen an accepting state, it
//! counts the steps taken since the most recent one; exceeding `stall_bound`
//! is reported as a suspected cycle.
//!
//! Findings are tagged [`ViolationKind::StalledWalk`] so they are never
//! confused with confirmed accepting cycles.

use crate::domain::config::RandomWalkConfig;
use crate::domain::explore::ViolationLog;
use crate::domain::frontier::FrontierEntry;
use crate::domain::model::TraversalPosition;
use crate::domain::report::{ViolationKind, ViolationTrace};
use crate::domain::state::Fingerprint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

/// How a single walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Too long without an accepting state
    Stalled {
        /// Path from the initial state to where the stall was detected
        states: Vec<Fingerprint>,
    },
    /// No successor (or an error state) after `steps` steps
    DeadEnd {
        /// Steps taken
        steps: u32,
    },
    /// Step budget spent without a stall
    Exhausted,
}

/// Walk randomly from `start`
pub fn probe<P: TraversalPosition>(start: &P, config: &RandomWalkConfig, rng: &mut StdRng) -> ProbeResult {
    let mut current = start.clone();
    let mut since_accepting: Option<u32> = current.is_accepting().then_some(0);

    for step in 0..config.max_steps {
        let Some(next) = current.random_successor(rng) else {
            return ProbeResult::DeadEnd { steps: step };
        };
        current = next;
        if current.status().is_error() {
            return ProbeResult::DeadEnd { steps: step + 1 };
        }

        since_accepting = if current.is_accepting() {
            Some(0)
        } else {
            since_accepting.map(|n| n + 1)
        };
        if since_accepting.is_some_and(|n| n > config.stall_bound) {
            return ProbeResult::Stalled {
                states: current.trace(),
            };
        }
    }
    ProbeResult::Exhausted
}

/// Probe up to `config.samples` entries; record stalls into `log`
///
/// The RNG is seeded from `config.seed` and the iteration so runs are
/// reproducible. Returns the number of new findings.
pub(crate) fn probe_frontier<P: TraversalPosition>(
    entries: &[FrontierEntry<P>],
    config: &RandomWalkConfig,
    iteration: u32,
    log: &ViolationLog,
) -> usize {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(u64::from(iteration)));
    let mut found = 0;
    for entry in entries.iter().take(config.samples) {
        let ProbeResult::Stalled { states } = probe(&entry.position, config, &mut rng) else {
            continue;
        };
        let Some(&last) = states.last() else {
            continue;
        };
        let trace = ViolationTrace {
            kind: ViolationKind::StalledWalk,
            states,
            worker: None,
            iteration,
        };
        if log.record_liveness(last, trace) {
            warn!(iteration, state = %last, "random walk stalled away from accepting states");
            found += 1;
        }
    }
    found
}
