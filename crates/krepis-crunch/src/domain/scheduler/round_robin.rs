//! Priority Round-Robin Scheduler
//!
//! The policy always picks the highest-priority runnable process, ties broken
//! by queue order. A delay rotates the chosen process to the back of the
//! queue, so the next process of the same priority gets its turn.
//!
//! Supports one custom operation, `set_priority(process, priority)`.

use super::types::{ProcessId, ProcessState, SchedulerError};
use super::DelayingScheduler;
use std::collections::BTreeMap;

/// Name of the dynamic priority operation
pub const SET_PRIORITY: &str = "set_priority";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProcessSlot {
    state: ProcessState,
    priority: i64,
}

/// Priority-based round robin with a delay budget
///
/// Derives `Hash` so models can fold the scheduler into their fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoundRobinScheduler {
    queue: Vec<ProcessId>,
    processes: BTreeMap<ProcessId, ProcessSlot>,
    delays: u32,
    max_delays: u32,
}

impl RoundRobinScheduler {
    /// Create a scheduler allowing `max_delays` deviations
    pub fn new(max_delays: u32) -> Self {
        Self {
            queue: Vec::new(),
            processes: BTreeMap::new(),
            delays: 0,
            max_delays,
        }
    }

    /// Deviations applied so far
    pub fn delays(&self) -> u32 {
        self.delays
    }

    /// State of `process`, if started
    pub fn state(&self, process: ProcessId) -> Option<ProcessState> {
        self.processes.get(&process).map(|slot| slot.state)
    }

    /// Priority of `process`, if started
    pub fn priority(&self, process: ProcessId) -> Option<i64> {
        self.processes.get(&process).map(|slot| slot.priority)
    }

    /// Change the priority of a started process
    pub fn set_priority(&mut self, process: ProcessId, priority: i64) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(process)?;
        slot.priority = priority;
        Ok(())
    }

    fn slot_mut(&mut self, process: ProcessId) -> Result<&mut ProcessSlot, SchedulerError> {
        self.processes
            .get_mut(&process)
            .ok_or(SchedulerError::UnknownProcess { process })
    }

    fn position_of_next(&self) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (index, process) in self.queue.iter().enumerate() {
            let Some(slot) = self.processes.get(process) else {
                continue;
            };
            if !slot.state.is_runnable() {
                continue;
            }
            if best.map_or(true, |(_, priority)| slot.priority > priority) {
                best = Some((index, slot.priority));
            }
        }
        best.map(|(index, _)| index)
    }
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self::new(u32::MAX)
    }
}

impl DelayingScheduler for RoundRobinScheduler {
    fn start(&mut self, process: ProcessId) -> Result<(), SchedulerError> {
        if let Some(slot) = self.processes.get(&process) {
            return Err(SchedulerError::AlreadyStarted {
                process,
                current_state: slot.state,
            });
        }
        self.processes.insert(
            process,
            ProcessSlot {
                state: ProcessState::Runnable,
                priority: 0,
            },
        );
        self.queue.push(process);
        Ok(())
    }

    fn finish(&mut self, process: ProcessId) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(process)?;
        slot.state = ProcessState::Completed;
        self.queue.retain(|p| *p != process);
        Ok(())
    }

    fn delay(&mut self) -> bool {
        if self.max_delay_reached() {
            return false;
        }
        let Some(index) = self.position_of_next() else {
            return false;
        };
        let process = self.queue.remove(index);
        self.queue.push(process);
        self.delays += 1;
        true
    }

    fn next(&self) -> Option<ProcessId> {
        self.position_of_next().map(|index| self.queue[index])
    }

    fn max_delay_reached(&self) -> bool {
        self.delays >= self.max_delays
    }

    fn on_blocked(&mut self, process: ProcessId) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(process)?;
        if !slot.state.is_runnable() {
            return Err(SchedulerError::InvalidProcessState {
                process,
                current_state: slot.state,
                expected_state: ProcessState::Runnable,
            });
        }
        slot.state = ProcessState::Blocked;
        Ok(())
    }

    fn on_enabled(&mut self, process: ProcessId) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(process)?;
        if slot.state.is_completed() {
            return Err(SchedulerError::InvalidProcessState {
                process,
                current_state: slot.state,
                expected_state: ProcessState::Blocked,
            });
        }
        slot.state = ProcessState::Runnable;
        Ok(())
    }

    fn invoke(&mut self, operation: &str, args: &[i64]) -> Result<(), SchedulerError> {
        match operation {
            SET_PRIORITY => {
                let [process, priority] = args else {
                    return Err(SchedulerError::InvalidArguments {
                        name: operation.to_string(),
                        expected: 2,
                        got: args.len(),
                    });
                };
                let process = usize::try_from(*process).map_err(|_| {
                    SchedulerError::InvalidArguments {
                        name: operation.to_string(),
                        expected: 2,
                        got: args.len(),
                    }
                })?;
                self.set_priority(ProcessId::new(process), *priority)
            }
            _ => Err(SchedulerError::UnknownOperation {
                name: operation.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(n: usize, max_delays: u32) -> RoundRobinScheduler {
        let mut sched = RoundRobinScheduler::new(max_delays);
        for id in 0..n {
            sched.start(ProcessId::new(id)).unwrap();
        }
        sched
    }

    #[test]
    fn test_next_follows_queue_order() {
        let sched = started(3, 0);
        assert_eq!(sched.next(), Some(ProcessId::new(0)));
    }

    #[test]
    fn test_delay_rotates_and_consumes_budget() {
        let mut sched = started(3, 2);
        assert!(sched.delay());
        assert_eq!(sched.next(), Some(ProcessId::new(1)));
        assert!(sched.delay());
        assert_eq!(sched.next(), Some(ProcessId::new(2)));
        assert!(sched.max_delay_reached());
        assert!(!sched.delay());
        assert_eq!(sched.delays(), 2);
    }

    #[test]
    fn test_blocked_processes_are_skipped() {
        let mut sched = started(2, 0);
        sched.on_blocked(ProcessId::new(0)).unwrap();
        assert_eq!(sched.next(), Some(ProcessId::new(1)));
        sched.on_enabled(ProcessId::new(0)).unwrap();
        assert_eq!(sched.next(), Some(ProcessId::new(0)));
    }

    #[test]
    fn test_finish_removes_from_rotation() {
        let mut sched = started(2, 0);
        sched.finish(ProcessId::new(0)).unwrap();
        assert_eq!(sched.next(), Some(ProcessId::new(1)));
        assert_eq!(sched.state(ProcessId::new(0)), Some(ProcessState::Completed));
        assert!(sched.on_enabled(ProcessId::new(0)).is_err());
        sched.finish(ProcessId::new(1)).unwrap();
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn test_set_priority_via_invoke() {
        let mut sched = started(3, 0);
        sched.invoke(SET_PRIORITY, &[2, 10]).unwrap();
        assert_eq!(sched.next(), Some(ProcessId::new(2)));
        assert_eq!(sched.priority(ProcessId::new(2)), Some(10));
    }

    #[test]
    fn test_invoke_rejects_bad_calls() {
        let mut sched = started(1, 0);
        assert!(matches!(
            sched.invoke("yield", &[]),
            Err(SchedulerError::UnknownOperation { .. })
        ));
        assert!(matches!(
            sched.invoke(SET_PRIORITY, &[0]),
            Err(SchedulerError::InvalidArguments { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            sched.invoke(SET_PRIORITY, &[7, 1]),
            Err(SchedulerError::UnknownProcess { .. })
        ));
    }

    #[test]
    fn test_double_start_rejected() {
        let mut sched = started(1, 0);
        assert!(sched.start(ProcessId::new(0)).is_err());
    }
}
