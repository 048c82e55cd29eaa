//! CancelFunding instruction - withdraw a deferred funding before it runs

use super::Context;
use crate::scheduler::{AutomationScheduler, TaskHandle};
use crate::state::{Pool, ResumeAction};
use crate::store::{LedgerStore, Transaction};
use log::info;
use ptsol_common::{pool_pda, EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Pending entry removed; `was_live` is false when the registration had
    /// already been consumed by a failed delivery
    Cancelled { handle: TaskHandle, was_live: bool },
    /// Nothing pending under this handle
    Stale,
}

/// Remove the pool's pending funding `handle` and cancel its registration.
///
/// Only the funder recorded on the task may cancel it. Cancelling an unknown
/// or already completed task succeeds without effect.
pub fn process_cancel_funding<S, A>(ctx: &mut Context<'_, S, A>, handle: TaskHandle) -> EngineResult<CancelOutcome>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let (pool_addr, _) = pool_pda(ctx.program_id());
    let mut tx = Transaction::new(&*ctx.store);
    let mut pool: Pool = tx.load_required(&pool_addr, EngineError::PoolNotInitialized)?;

    let Some(task) = pool.pending_task(&handle) else {
        return Ok(CancelOutcome::Stale);
    };
    match &task.action {
        ResumeAction::FundPool { funder, .. } if *funder == ctx.signer => {}
        ResumeAction::FundPool { .. } => return Err(EngineError::Unauthorized),
        ResumeAction::Release { .. } => return Err(EngineError::AccountKindMismatch),
    }

    let task_id = task.task_id.clone();
    pool.take_pending(&handle);
    let was_live = ctx.scheduler.is_live(&handle);
    ctx.scheduler.cancel_task(&handle);
    tx.put(pool_addr, pool);
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!("CancelFunding: {} withdrew task {} (live: {})", ctx.signer, task_id, was_live);
    Ok(CancelOutcome::Cancelled { handle, was_live })
}
