//! InitializeStaking instruction - create the staking vault

use super::{Context, InitOutcome};
use crate::scheduler::AutomationScheduler;
use crate::state::{MintRecord, VaultAccount};
use crate::store::{LedgerStore, Transaction};
use log::info;
use ptsol_common::{vault_pda, EngineError, EngineResult};
use solana_program::pubkey::Pubkey;

/// Create the vault for `mint`. Idempotent for the same mint; a vault already
/// bound to another mint is a configuration error.
pub fn process_initialize_staking<S, A>(ctx: &mut Context<'_, S, A>, mint: Pubkey) -> EngineResult<InitOutcome>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let (vault_addr, bump) = vault_pda(ctx.program_id());
    let mut tx = Transaction::new(&*ctx.store);

    tx.load_required::<MintRecord>(&mint, EngineError::AssetNotRecognized(mint))?;

    if let Some(vault) = tx.load::<VaultAccount>(&vault_addr)? {
        if vault.mint != mint {
            return Err(EngineError::ConfigurationError(format!(
                "vault already bound to {}, refusing {}",
                vault.mint, mint
            )));
        }
        info!("InitializeStaking: vault {} already initialized", vault_addr);
        return Ok(InitOutcome::AlreadyInitialized);
    }

    tx.put(vault_addr, VaultAccount::new(mint, bump));
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!("InitializeStaking: vault {} created for {}", vault_addr, mint);
    Ok(InitOutcome::Created)
}
