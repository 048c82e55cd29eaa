//! FundPool instruction - move a caller's balance into the pool's reserves

use super::Context;
use crate::scheduler::{AutomationScheduler, ScheduledTask, TaskHandle};
use crate::state::{MintRecord, PendingTask, Pool, ResumeAction};
use crate::store::{LedgerStore, Transaction};
use log::{debug, info, warn};
use ptsol_common::{custody_address, pool_pda, thread_pda, EngineError, EngineResult, FundingSchedule};
use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundOutcome {
    /// Funds moved; `reserve` is the slot's balance afterwards
    Funded { mint: Pubkey, reserve: u64 },
    /// Funding registered for later; no funds moved yet
    Scheduled { handle: TaskHandle },
}

/// Stage the debit of `source` and the credit of the asset's reserve slot,
/// allocating the slot if needed.
///
/// Checks run in order: asset recognized, slot available, source authorized
/// and sufficiently funded.
pub(crate) fn transfer_into_pool<S: LedgerStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    program_id: &Pubkey,
    pool_addr: &Pubkey,
    pool: &mut Pool,
    authority: &Pubkey,
    mint: &Pubkey,
    source: &Pubkey,
    quantity: u64,
) -> EngineResult<u64> {
    if quantity == 0 {
        return Err(EngineError::ZeroAmount);
    }
    tx.load_required::<MintRecord>(mint, EngineError::AssetNotRecognized(*mint))?;

    let custody = custody_address(program_id, pool_addr, mint);
    let slot = pool.add_asset(*mint, custody)?;

    let debited = tx.debit_token(source, authority, mint, quantity)?;
    let reserve = tx.credit_token(&slot.custody, pool_addr, mint, quantity)?;

    debug!(
        "FundPool: {} {} -> {} (source left {}, reserve now {})",
        quantity, mint, slot.custody, debited.amount, reserve.amount
    );
    Ok(reserve.amount)
}

/// Fund the pool now, or register the funding for later when `schedule` is set.
///
/// The deferred form runs every check against current state up front so an
/// obviously doomed funding is never registered.
pub fn process_fund_pool<S, A>(
    ctx: &mut Context<'_, S, A>,
    mint: Pubkey,
    source: Pubkey,
    quantity: u64,
    schedule: Option<FundingSchedule>,
) -> EngineResult<FundOutcome>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let program_id = *ctx.program_id();
    let (pool_addr, _) = pool_pda(&program_id);
    let signer = ctx.signer;

    let mut tx = Transaction::new(&*ctx.store);
    let mut pool: Pool = tx.load_required(&pool_addr, EngineError::PoolNotInitialized)?;

    let Some(schedule) = schedule else {
        let reserve = transfer_into_pool(&mut tx, &program_id, &pool_addr, &mut pool, &signer, &mint, &source, quantity)?;
        tx.put(pool_addr, pool);
        let batch = tx.into_batch();
        ctx.store.apply(batch);

        info!("FundPool: {} funded {} of {} (reserve {})", signer, quantity, mint, reserve);
        return Ok(FundOutcome::Funded { mint, reserve });
    };

    // Dry run on a scratch copy; discarded either way
    {
        let mut probe = Transaction::new(&*ctx.store);
        let mut scratch = pool.clone();
        transfer_into_pool(&mut probe, &program_id, &pool_addr, &mut scratch, &signer, &mint, &source, quantity)?;
    }

    let handle = thread_pda(&program_id, &ctx.thread_authority(), schedule.task_id.as_bytes())?;
    if pool.pending_task(&handle).is_some() {
        if ctx.scheduler.is_live(&handle) {
            return Err(EngineError::DuplicateTaskIdentifier);
        }
        // Registration consumed without completing; the identifier is free again
        warn!("FundPool: replacing dead pending task {} ({})", schedule.task_id, handle);
        pool.take_pending(&handle);
    }

    ctx.scheduler.register_task(ScheduledTask {
        handle,
        target: pool_addr,
        trigger: schedule.trigger,
    })?;

    pool.pending.push(PendingTask {
        handle,
        task_id: schedule.task_id.clone(),
        trigger: schedule.trigger,
        registered_at: ctx.clock.unix_timestamp,
        action: ResumeAction::FundPool {
            funder: signer,
            mint,
            source,
            quantity,
        },
    });
    tx.put(pool_addr, pool);
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!(
        "FundPool: {} scheduled {} of {} as task {} ({:?})",
        signer, quantity, mint, schedule.task_id, schedule.trigger
    );
    Ok(FundOutcome::Scheduled { handle })
}

#[cfg(all(test, not(target_os = "solana")))]
#[path = "fund_pool_test.rs"]
mod fund_pool_test;
