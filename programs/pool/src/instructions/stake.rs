//! Stake instruction - deposit into the vault and schedule the release

use super::Context;
use crate::scheduler::{AutomationScheduler, ScheduledTask, TaskHandle};
use crate::state::{PendingTask, ResumeAction, StakeRecord, VaultAccount};
use crate::store::{LedgerStore, Transaction};
use log::{debug, info};
use ptsol_common::{
    checked_add, stake_info_pda, thread_pda, vault_pda, EngineError, EngineResult, TaskId, Trigger,
};
use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeReceipt {
    /// Principal's total after this deposit
    pub staked_amount: u64,
    /// Release task now owned by the stake record
    pub handle: TaskHandle,
    /// Previous release task, cancelled in favour of `handle`
    pub replaced: Option<TaskHandle>,
}

/// Stake `amount` from `source` for the signer.
///
/// Creates the stake record on first use, otherwise adds to it. Registers a
/// release task named by `task_id`, due `release_delay_secs` from now. A
/// restake cancels the earlier release so the record never points at more
/// than one live registration.
pub fn process_stake<S, A>(
    ctx: &mut Context<'_, S, A>,
    mint: Pubkey,
    source: Pubkey,
    amount: u64,
    task_id: TaskId,
) -> EngineResult<StakeReceipt>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    if amount == 0 {
        return Err(EngineError::ZeroAmount);
    }

    let program_id = *ctx.program_id();
    let signer = ctx.signer;
    let (vault_addr, _) = vault_pda(&program_id);
    let (stake_addr, bump) = stake_info_pda(&program_id, &signer);

    let mut tx = Transaction::new(&*ctx.store);
    let mut vault: VaultAccount = tx.load_required(&vault_addr, EngineError::StakingNotInitialized)?;
    if mint != vault.mint {
        return Err(EngineError::AssetNotRecognized(mint));
    }

    let mut record = tx
        .load::<StakeRecord>(&stake_addr)?
        .unwrap_or_else(|| StakeRecord::new(signer, bump));

    tx.debit_token(&source, &signer, &mint, amount)?;
    vault.balance = checked_add(vault.balance, amount)?;
    vault.total_staked = checked_add(vault.total_staked, amount)?;

    if !record.is_active() {
        record.staked_at = ctx.clock.unix_timestamp;
        record.stake_at_slot = ctx.clock.slot;
    }
    record.staked_amount = checked_add(record.staked_amount, amount)?;

    let handle = thread_pda(&program_id, &ctx.thread_authority(), task_id.as_bytes())?;
    let due = ctx
        .clock
        .unix_timestamp
        .checked_add(ctx.config.release_delay_secs)
        .ok_or(EngineError::MathOverflow)?;
    let trigger = Trigger::Timestamp(due);
    debug!("Stake: record {} task {} -> handle {}", stake_addr, task_id, handle);

    ctx.scheduler.register_task(ScheduledTask {
        handle,
        target: stake_addr,
        trigger,
    })?;

    let previous = record.pending_task.replace(PendingTask {
        handle,
        task_id: task_id.clone(),
        trigger,
        registered_at: ctx.clock.unix_timestamp,
        action: ResumeAction::Release {
            principal: signer,
            destination: source,
        },
    });
    let replaced = previous.map(|t| t.handle).filter(|h| *h != handle);
    if let Some(old) = replaced {
        ctx.scheduler.cancel_task(&old);
    }

    let staked_amount = record.staked_amount;
    tx.put(vault_addr, vault);
    tx.put(stake_addr, record);
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!(
        "Stake: {} staked {} (total {}), release task {} due at {}",
        signer, amount, staked_amount, task_id, due
    );
    Ok(StakeReceipt {
        staked_amount,
        handle,
        replaced,
    })
}

#[cfg(all(test, not(target_os = "solana")))]
#[path = "stake_test.rs"]
mod stake_test;
