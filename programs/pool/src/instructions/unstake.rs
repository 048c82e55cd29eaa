//! Unstake instruction - release a principal's whole stake

use super::Context;
use crate::scheduler::{AutomationScheduler, TaskHandle};
use crate::state::{StakeRecord, VaultAccount};
use crate::store::{LedgerStore, Transaction};
use log::{error, info};
use ptsol_common::{stake_info_pda, vault_pda, EngineError, EngineResult};
use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnstakeReceipt {
    pub principal: Pubkey,
    pub released: u64,
    /// Release task cleared from the record
    pub cleared_task: Option<TaskHandle>,
}

/// Stage the full release of `principal`'s stake into `destination`.
///
/// The vault must cover the recorded amount; if it does not, the vault and
/// the stake registry have diverged and the failure is fatal.
pub(crate) fn release_stake<S: LedgerStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    program_id: &Pubkey,
    principal: &Pubkey,
    destination: &Pubkey,
) -> EngineResult<UnstakeReceipt> {
    let (stake_addr, _) = stake_info_pda(program_id, principal);
    let mut record = tx
        .load::<StakeRecord>(&stake_addr)?
        .filter(StakeRecord::is_active)
        .ok_or(EngineError::NoActiveStake)?;

    let (vault_addr, _) = vault_pda(program_id);
    let mut vault: VaultAccount = tx.load_required(&vault_addr, EngineError::StakingNotInitialized)?;

    let amount = record.staked_amount;
    if vault.balance < amount || vault.total_staked < amount {
        error!(
            "ALERT: vault {} underfunded: balance {}, total staked {}, releasing {} for {}",
            vault_addr, vault.balance, vault.total_staked, amount, principal
        );
        return Err(EngineError::VaultUnderfunded {
            balance: vault.balance,
            staked: amount,
        });
    }

    vault.balance -= amount;
    vault.total_staked -= amount;
    tx.credit_token(destination, principal, &vault.mint, amount)?;

    record.staked_amount = 0;
    record.staked_at = 0;
    record.stake_at_slot = 0;
    let cleared_task = record.pending_task.take().map(|t| t.handle);

    tx.put(vault_addr, vault);
    tx.put(stake_addr, record);

    Ok(UnstakeReceipt {
        principal: *principal,
        released: amount,
        cleared_task,
    })
}

/// Release the signer's whole stake into `destination` and cancel the
/// pending release task, if any.
pub fn process_unstake<S, A>(ctx: &mut Context<'_, S, A>, destination: Pubkey) -> EngineResult<UnstakeReceipt>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let program_id = *ctx.program_id();
    let signer = ctx.signer;

    let mut tx = Transaction::new(&*ctx.store);
    let receipt = release_stake(&mut tx, &program_id, &signer, &destination)?;

    if let Some(handle) = &receipt.cleared_task {
        ctx.scheduler.cancel_task(handle);
    }
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!("Unstake: {} released {} to {}", signer, receipt.released, destination);
    Ok(receipt)
}
