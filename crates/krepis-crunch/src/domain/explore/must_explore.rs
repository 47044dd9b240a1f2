//! Must-Explore Decision
//!
//! The single arbiter of duplicate suppression. Given a state key and the
//! bounds of the position under consideration, decide whether the position
//! has to be walked now.
//!
//! # Depth Mode
//!
//! ```text
//! Frontier has key at depth f   f <  d  → evict from frontier, Explore
//!                               f >= d  → Partial(f)
//! Live has key                  complete → Fully
//!                               d >= e  → Partial(e)
//!                               d <  e  → Explore
//! Dead has key                  e <= 0  → Fully
//!                               d >= e  → Partial(e)
//!                               d <  e  → evict from dead, Explore
//! nowhere                               → Explore
//! ```
//!
//! (`d` = depth of the position, `e` = recorded `explore_if_depth_lower_than`)
//!
//! The frontier is consulted under the full [`FrontierKey`], so a red search
//! only sees entries deferred under its own seed. Dead and live records are
//! shared by every search.
//!
//! # Delay Mode
//!
//! Presence in the frontier means "not yet due". Otherwise a state is
//! explored only when absent from both tables. The key already carries the
//! magic bit, so a state seen in the other liveness phase counts as absent.

use crate::domain::bounds::BoundMode;
use crate::domain::frontier::{FrontierKey, FrontierSet};
use crate::domain::state::{Bounds, DeadStateTable, LiveStateTable};

/// Verdict of [`must_explore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Walk the position now
    Explore,
    /// Nothing left to find below this state
    FullyExplored,
    /// Already covered down to the reported depth; re-exploration is someone else's job
    PartiallyExplored {
        /// Depth recorded for the state
        explore_if_depth_lower_than: i32,
    },
}

/// Read/evict access to the bookkeeping consulted by [`must_explore`]
///
/// `frontier` is `None` when the next frontier lives on disk.
#[derive(Debug)]
pub struct ExploreTables<'a, P> {
    /// Permanent records
    pub dead: &'a DeadStateTable,
    /// Current iteration's records
    pub live: &'a LiveStateTable,
    /// Frontier being built for the next iteration
    pub frontier: Option<&'a FrontierSet<P>>,
}

impl<P> Clone for ExploreTables<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for ExploreTables<'_, P> {}

/// Decide whether a position must be walked
///
/// May evict a stale frontier entry or a stale dead record for `key`; the
/// caller is then expected to walk (or defer) the position itself, which
/// keeps every state in at most one of the three structures.
pub fn must_explore<P: Clone>(
    tables: &ExploreTables<'_, P>,
    mode: BoundMode,
    key: FrontierKey,
    bounds: &Bounds,
) -> Decision {
    match mode {
        BoundMode::Delay => decide_by_presence(tables, key),
        BoundMode::Depth => decide_by_depth(tables, key, bounds.depth_i32()),
    }
}

fn decide_by_presence<P: Clone>(tables: &ExploreTables<'_, P>, key: FrontierKey) -> Decision {
    if let Some(recorded) = tables.frontier.and_then(|f| f.recorded_bounds(key)) {
        return Decision::PartiallyExplored {
            explore_if_depth_lower_than: recorded.depth_i32(),
        };
    }
    if tables.live.contains(key.state) || tables.dead.contains(key.state) {
        return Decision::FullyExplored;
    }
    Decision::Explore
}

fn decide_by_depth<P: Clone>(tables: &ExploreTables<'_, P>, key: FrontierKey, depth: i32) -> Decision {
    if let Some(frontier) = tables.frontier {
        if let Some(recorded) = frontier.recorded_bounds(key) {
            if recorded.depth_i32() < depth {
                frontier.remove(key);
                return Decision::Explore;
            }
            return Decision::PartiallyExplored {
                explore_if_depth_lower_than: recorded.depth_i32(),
            };
        }
    }

    let state = key.state;
    if let Some(live) = tables.live.lookup(state) {
        if live.completely_explored {
            return Decision::FullyExplored;
        }
        if depth >= live.explore_if_depth_lower_than {
            return Decision::PartiallyExplored {
                explore_if_depth_lower_than: live.explore_if_depth_lower_than,
            };
        }
        return Decision::Explore;
    }

    if let Some(dead) = tables.dead.lookup(state) {
        if dead.is_fully_explored() {
            return Decision::FullyExplored;
        }
        if depth >= dead.explore_if_depth_lower_than {
            return Decision::PartiallyExplored {
                explore_if_depth_lower_than: dead.explore_if_depth_lower_than,
            };
        }
        tables.dead.remove(state);
        return Decision::Explore;
    }

    Decision::Explore
}
