//! Time-ordered task queue (min-heap by due time)
//!
//! Wall-clock and slot triggers live in separate lanes: the two clocks are not
//! comparable, so a far-off timestamp must not block a slot task that is due.

use priority_queue::PriorityQueue;
use ptsol_common::{EngineError, EngineResult, Trigger};
use ptsol_pool::{AutomationScheduler, ScheduledTask, TaskHandle};
use solana_program::clock::Clock;
use std::cmp::Reverse;
use std::collections::HashMap;

type Lane = PriorityQueue<TaskHandle, Reverse<(u8, i64)>>;

/// Live registrations, ordered by trigger
pub struct TaskQueue {
    /// Immediate and timestamp triggers
    by_time: Lane,
    by_slot: Lane,
    /// Map for O(1) lookups
    tasks: HashMap<TaskHandle, ScheduledTask>,
    cancelled: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            by_time: PriorityQueue::new(),
            by_slot: PriorityQueue::new(),
            tasks: HashMap::new(),
            cancelled: 0,
        }
    }

    /// Rebuild from persisted registrations
    pub fn from_tasks(tasks: impl IntoIterator<Item = ScheduledTask>) -> EngineResult<Self> {
        let mut queue = Self::new();
        for task in tasks {
            queue.register_task(task)?;
        }
        Ok(queue)
    }

    fn lane_mut(&mut self, trigger: &Trigger) -> &mut Lane {
        match trigger {
            Trigger::Slot(_) => &mut self.by_slot,
            Trigger::Immediate | Trigger::Timestamp(_) => &mut self.by_time,
        }
    }

    /// Remove and return up to `limit` tasks due at `clock`, earliest first
    pub fn pop_due(&mut self, clock: &Clock, limit: usize) -> Vec<ScheduledTask> {
        let mut due = Vec::new();
        drain_lane(&mut self.by_time, &mut self.tasks, clock, limit, &mut due);
        drain_lane(&mut self.by_slot, &mut self.tasks, clock, limit, &mut due);
        due
    }

    /// Earliest wall-clock task without removing it
    pub fn peek(&self) -> Option<&ScheduledTask> {
        let (handle, _) = self.by_time.peek().or_else(|| self.by_slot.peek())?;
        self.tasks.get(handle)
    }

    /// All registrations in trigger order
    pub fn tasks(&self) -> Vec<ScheduledTask> {
        let mut all: Vec<ScheduledTask> = self.tasks.values().copied().collect();
        all.sort_by_key(|t| (t.trigger.sort_key(), t.handle));
        all
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn drain_lane(
    lane: &mut Lane,
    tasks: &mut HashMap<TaskHandle, ScheduledTask>,
    clock: &Clock,
    limit: usize,
    out: &mut Vec<ScheduledTask>,
) {
    while out.len() < limit {
        let Some((handle, _)) = lane.peek() else {
            break;
        };
        let handle = *handle;
        match tasks.get(&handle) {
            Some(task) if !task.trigger.is_due(clock) => break,
            Some(_) => {
                lane.pop();
                if let Some(task) = tasks.remove(&handle) {
                    out.push(task);
                }
            }
            None => {
                lane.pop();
            }
        }
    }
}

impl AutomationScheduler for TaskQueue {
    fn register_task(&mut self, task: ScheduledTask) -> EngineResult<TaskHandle> {
        if self.tasks.contains_key(&task.handle) {
            return Err(EngineError::DuplicateTaskIdentifier);
        }
        let priority = Reverse(task.trigger.sort_key());
        self.lane_mut(&task.trigger).push(task.handle, priority);
        self.tasks.insert(task.handle, task);
        log::debug!("Registered task {} for {} ({:?})", task.handle, task.target, task.trigger);
        Ok(task.handle)
    }

    fn cancel_task(&mut self, handle: &TaskHandle) {
        if let Some(task) = self.tasks.remove(handle) {
            self.lane_mut(&task.trigger).remove(handle);
            self.cancelled += 1;
            log::debug!("Cancelled task {}", handle);
        }
    }

    fn is_live(&self, handle: &TaskHandle) -> bool {
        self.tasks.contains_key(handle)
    }
}
