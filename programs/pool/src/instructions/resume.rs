//! Resume instruction - scheduler re-invocation of a deferred task
//!
//! The resumed leg is its own atomic operation. If it fails nothing is
//! written, the pending task stays on its record and reconciliation reports
//! it once the scheduler has let go of the registration.

use super::fund_pool::transfer_into_pool;
use super::unstake::{release_stake, UnstakeReceipt};
use super::Context;
use crate::scheduler::{AutomationScheduler, TaskHandle};
use crate::state::{PendingTask, Record, ResumeAction};
use crate::store::{LedgerStore, Transaction};
use log::{info, warn};
use ptsol_common::{EngineError, EngineResult};
use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Deferred funding executed
    Funded { mint: Pubkey, quantity: u64, reserve: u64 },
    /// Automated release executed
    Released(UnstakeReceipt),
    /// No pending task with this handle on the target; already completed,
    /// cancelled or never registered
    Stale,
}

/// Execute the pending task `handle` stored on `target`.
pub fn process_resume<S, A>(ctx: &mut Context<'_, S, A>, target: Pubkey, handle: TaskHandle) -> EngineResult<ResumeOutcome>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let program_id = *ctx.program_id();
    let mut tx = Transaction::new(&*ctx.store);

    let (task, pool) = match tx.get(&target) {
        Some(Record::Pool(pool)) => match pool.pending_task(&handle) {
            Some(task) => (task.clone(), Some(pool.clone())),
            None => return Ok(stale(&target, &handle)),
        },
        Some(Record::Stake(record)) => match &record.pending_task {
            Some(task) if task.handle == handle => (task.clone(), None),
            _ => return Ok(stale(&target, &handle)),
        },
        Some(_) => return Err(EngineError::AccountKindMismatch),
        None => return Ok(stale(&target, &handle)),
    };

    if !task.trigger.is_due(ctx.clock) {
        return Err(EngineError::TaskNotDue);
    }

    let outcome = match (&task.action, pool) {
        (ResumeAction::FundPool { funder, mint, source, quantity }, Some(mut pool)) => {
            pool.take_pending(&handle);
            let reserve = transfer_into_pool(&mut tx, &program_id, &target, &mut pool, funder, mint, source, *quantity)?;
            tx.put(target, pool);
            ResumeOutcome::Funded {
                mint: *mint,
                quantity: *quantity,
                reserve,
            }
        }
        (ResumeAction::Release { principal, destination }, None) => {
            ResumeOutcome::Released(release_stake(&mut tx, &program_id, principal, destination)?)
        }
        // Action stored on a record of the wrong kind
        _ => return Err(EngineError::AccountKindMismatch),
    };

    // Delivery normally consumed the registration already
    ctx.scheduler.cancel_task(&handle);
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    log_resumed(&task, &outcome);
    Ok(outcome)
}

fn stale(target: &Pubkey, handle: &TaskHandle) -> ResumeOutcome {
    warn!("Resume: no pending task {} on {}, ignoring stale delivery", handle, target);
    ResumeOutcome::Stale
}

fn log_resumed(task: &PendingTask, outcome: &ResumeOutcome) {
    match outcome {
        ResumeOutcome::Funded { mint, quantity, reserve } => {
            info!("Resume: task {} funded {} of {} (reserve {})", task.task_id, quantity, mint, reserve)
        }
        ResumeOutcome::Released(receipt) => {
            info!("Resume: task {} released {} to {}", task.task_id, receipt.released, receipt.principal)
        }
        ResumeOutcome::Stale => {}
    }
}
