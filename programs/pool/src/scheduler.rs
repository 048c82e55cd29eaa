//! Deferred-execution seam
//!
//! The scheduler is external. The engine only registers, cancels and asks
//! about liveness; delivery is at most once and may never happen.

use ptsol_common::{EngineError, EngineResult, Trigger};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;

/// Opaque handle of a registration (the derived thread address)
pub type TaskHandle = Pubkey;

/// A registration as the scheduler sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub handle: TaskHandle,
    /// Record that owns the pending task; re-invocation is `Resume { target, handle }`
    pub target: Pubkey,
    pub trigger: Trigger,
}

pub trait AutomationScheduler {
    /// Fails with `DuplicateTaskIdentifier` if the handle is already live
    fn register_task(&mut self, task: ScheduledTask) -> EngineResult<TaskHandle>;

    /// Idempotent; unknown or already-fired handles are ignored
    fn cancel_task(&mut self, handle: &TaskHandle);

    fn is_live(&self, handle: &TaskHandle) -> bool;
}

/// Deterministic in-memory scheduler for tests
#[derive(Debug, Default, Clone)]
pub struct MemoryScheduler {
    live: BTreeMap<TaskHandle, ScheduledTask>,
    cancelled: u64,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a task: removes the registration and hands it back so the
    /// caller can issue the re-invocation. A second call returns `None`.
    pub fn fire(&mut self, handle: &TaskHandle) -> Option<ScheduledTask> {
        self.live.remove(handle)
    }

    /// Lose a registration without delivering it
    pub fn drop_task(&mut self, handle: &TaskHandle) -> bool {
        self.live.remove(handle).is_some()
    }

    pub fn task(&self, handle: &TaskHandle) -> Option<&ScheduledTask> {
        self.live.get(handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

impl AutomationScheduler for MemoryScheduler {
    fn register_task(&mut self, task: ScheduledTask) -> EngineResult<TaskHandle> {
        if self.live.contains_key(&task.handle) {
            return Err(EngineError::DuplicateTaskIdentifier);
        }
        self.live.insert(task.handle, task);
        Ok(task.handle)
    }

    fn cancel_task(&mut self, handle: &TaskHandle) {
        if self.live.remove(handle).is_some() {
            self.cancelled += 1;
        }
    }

    fn is_live(&self, handle: &TaskHandle) -> bool {
        self.live.contains_key(handle)
    }
}
