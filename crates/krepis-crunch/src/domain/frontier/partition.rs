//! Frontier Partitions & Work Stealing
//!
//! The frontier consumed by an iteration is split into one FIFO queue per
//! worker. A worker drains its own queue from the front; once empty it steals
//! a batch from the back of another worker's queue.
//!
//! # Locking
//!
//! A thief holds the victim's lock only while splitting off the batch, then
//! releases it before touching its own queue. No thread ever holds two
//! partition locks at once.
//!
//! Nothing is pushed into partitions during an iteration (deferred work goes
//! to the next frontier), so a worker that finds every queue empty is done.

use super::FrontierEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Outcome of a successful steal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealReport {
    /// Worker whose queue was robbed
    pub victim: usize,
    /// Entries moved, including the one returned
    pub count: usize,
}

/// Per-worker queues of one iteration's frontier
#[derive(Debug)]
pub struct Partitions<P> {
    queues: Vec<Mutex<VecDeque<FrontierEntry<P>>>>,
    steal_batch: usize,
}

impl<P> Partitions<P> {
    /// Split `entries` into `workers` queues by owning worker
    ///
    /// Entries keep their relative order inside a queue.
    pub fn distribute(entries: Vec<FrontierEntry<P>>, workers: usize, steal_batch: usize) -> Self {
        let workers = workers.max(1);
        let mut queues: Vec<VecDeque<FrontierEntry<P>>> =
            (0..workers).map(|_| VecDeque::new()).collect();
        for entry in entries {
            queues[entry.owner_worker % workers].push_back(entry);
        }
        Self {
            queues: queues.into_iter().map(Mutex::new).collect(),
            steal_batch: steal_batch.max(1),
        }
    }

    /// Number of queues
    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    /// Take the next entry from `worker`'s own queue
    pub fn pop_local(&self, worker: usize) -> Option<FrontierEntry<P>> {
        self.queues[worker % self.queues.len()].lock().pop_front()
    }

    /// Steal a batch from the first non-empty queue after `thief`'s
    ///
    /// Returns the first stolen entry; the rest are appended to the thief's
    /// own queue.
    pub fn steal(&self, thief: usize) -> Option<(FrontierEntry<P>, StealReport)> {
        let workers = self.queues.len();
        let thief = thief % workers;
        for offset in 1..workers {
            let victim = (thief + offset) % workers;
            let mut batch = {
                let mut queue = self.queues[victim].lock();
                if queue.is_empty() {
                    continue;
                }
                let take = self.steal_batch.min(queue.len());
                let at = queue.len() - take;
                queue.split_off(at)
            };
            let count = batch.len();
            let first = batch.pop_front()?;
            if !batch.is_empty() {
                self.queues[thief].lock().extend(batch);
            }
            return Some((first, StealReport { victim, count }));
        }
        None
    }

    /// Own queue first, then steal
    pub fn next(&self, worker: usize) -> Option<(FrontierEntry<P>, Option<StealReport>)> {
        if let Some(entry) = self.pop_local(worker) {
            return Some((entry, None));
        }
        self.steal(worker).map(|(entry, report)| (entry, Some(report)))
    }
}
