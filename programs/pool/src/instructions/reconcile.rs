//! Reconciliation - read-only scan for stuck tasks and vault divergence
//!
//! The scheduler may never deliver a task. That shows up only as a pending
//! task that outlives its registration, or one that stays due for too long.

use crate::config::EngineConfig;
use crate::scheduler::{AutomationScheduler, TaskHandle};
use crate::state::{PendingTask, Record, TaskKind};
use crate::store::LedgerStore;
use log::{error, warn};
use ptsol_common::{TaskId, Trigger};
use solana_program::{clock::Clock, pubkey::Pubkey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckReason {
    /// The scheduler holds no registration for the task
    Orphaned,
    /// Registered, but due for longer than the grace period
    Overdue { overdue_secs: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckTask {
    /// Record owning the pending task
    pub target: Pubkey,
    pub handle: TaskHandle,
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub reason: StuckReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultShortfall {
    pub vault: Pubkey,
    pub balance: u64,
    /// Sum of all stake records
    pub staked: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub pending_tasks: usize,
    pub stuck: Vec<StuckTask>,
    pub vault_shortfall: Option<VaultShortfall>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.stuck.is_empty() && self.vault_shortfall.is_none()
    }
}

/// Seconds a task has been due, if it is due
fn overdue_secs(task: &PendingTask, clock: &Clock) -> Option<i64> {
    if !task.trigger.is_due(clock) {
        return None;
    }
    let due_at = match task.trigger {
        Trigger::Timestamp(ts) => ts,
        // Slot triggers carry no wall time; measure from registration
        Trigger::Immediate | Trigger::Slot(_) => task.registered_at,
    };
    Some(clock.unix_timestamp.saturating_sub(due_at))
}

/// Scan every record and report pending tasks the scheduler lost or left
/// overdue, plus any shortfall of the vault against the stake registry.
pub fn process_reconcile<S, A>(config: &EngineConfig, store: &S, scheduler: &A, clock: &Clock) -> ReconcileReport
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let mut report = ReconcileReport::default();
    let mut staked: u128 = 0;
    let mut vault = None;

    let inspect = |target: &Pubkey, task: &PendingTask, report: &mut ReconcileReport| {
        report.pending_tasks += 1;
        let reason = if !scheduler.is_live(&task.handle) {
            Some(StuckReason::Orphaned)
        } else {
            overdue_secs(task, clock)
                .filter(|secs| *secs > config.stuck_task_grace_secs)
                .map(|overdue_secs| StuckReason::Overdue { overdue_secs })
        };
        if let Some(reason) = reason {
            warn!("Reconcile: task {} on {} is stuck ({:?})", task.task_id, target, reason);
            report.stuck.push(StuckTask {
                target: *target,
                handle: task.handle,
                task_id: task.task_id.clone(),
                kind: task.action.kind(),
                reason,
            });
        }
    };

    for (address, record) in store.records() {
        match record {
            Record::Pool(pool) => {
                for task in &pool.pending {
                    inspect(address, task, &mut report);
                }
            }
            Record::Stake(stake) => {
                staked += stake.staked_amount as u128;
                if let Some(task) = &stake.pending_task {
                    inspect(address, task, &mut report);
                }
            }
            Record::Vault(v) => vault = Some((*address, v.balance)),
            Record::Mint(_) | Record::TokenAccount(_) => {}
        }
    }

    if let Some((address, balance)) = vault {
        if (balance as u128) < staked {
            error!(
                "ALERT: vault {} holds {} but stake records total {}",
                address, balance, staked
            );
            report.vault_shortfall = Some(VaultShortfall {
                vault: address,
                balance,
                staked,
            });
        }
    }

    report
}
