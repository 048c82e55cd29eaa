//! Swap instruction - trade one pooled asset for another against K

use super::Context;
use crate::math::{pool_reserves, quote_swap, InvariantValue};
use crate::scheduler::AutomationScheduler;
use crate::state::{Pool, TokenAccount};
use crate::store::{LedgerStore, Transaction};
use log::{error, info};
use ptsol_common::{pool_pda, EngineError, EngineResult};
use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapReceipt {
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee: u64,
}

/// Pay `amount` of `pay_mint` from `payer_pay` and receive the quoted amount
/// of `receive_mint` into `payer_receive` (created for the signer if absent).
pub fn process_swap<S, A>(
    ctx: &mut Context<'_, S, A>,
    pay_mint: Pubkey,
    receive_mint: Pubkey,
    payer_pay: Pubkey,
    payer_receive: Pubkey,
    amount: u64,
) -> EngineResult<SwapReceipt>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    if amount == 0 {
        return Err(EngineError::InvalidSwapZeroAmount);
    }
    if pay_mint == receive_mint {
        return Err(EngineError::InvalidSwapMatchingAssets);
    }

    let (pool_addr, _) = pool_pda(ctx.program_id());
    let signer = ctx.signer;
    let mut tx = Transaction::new(&*ctx.store);
    let pool: Pool = tx.load_required(&pool_addr, EngineError::PoolNotInitialized)?;

    let pay_slot = *pool.slot(&pay_mint).ok_or(EngineError::AssetNotRecognized(pay_mint))?;
    let receive_slot = *pool
        .slot(&receive_mint)
        .ok_or(EngineError::AssetNotRecognized(receive_mint))?;

    let k_before = InvariantValue::from_reserves(pool_reserves(&tx, &pool)?);
    let reserve_of = |tx: &Transaction<'_, S>, custody: &Pubkey| -> EngineResult<u64> {
        Ok(tx.load::<TokenAccount>(custody)?.map(|a| a.amount).unwrap_or(0))
    };
    let quote = quote_swap(
        reserve_of(&tx, &pay_slot.custody)?,
        reserve_of(&tx, &receive_slot.custody)?,
        amount,
        ctx.config.swap_fee_bps,
    )?;

    // Pay leg then receive leg
    tx.debit_token(&payer_pay, &signer, &pay_mint, amount)?;
    tx.credit_token(&pay_slot.custody, &pool_addr, &pay_mint, amount)?;
    tx.debit_token(&receive_slot.custody, &pool_addr, &receive_mint, quote.amount_out)?;
    tx.credit_token(&payer_receive, &signer, &receive_mint, quote.amount_out)?;

    let k_after = InvariantValue::from_reserves(pool_reserves(&tx, &pool)?);
    if k_after.value() < k_before.value() {
        error!("ALERT: swap would decrease K from {} to {}; rejected", k_before, k_after);
        return Err(EngineError::InvariantViolated);
    }

    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!(
        "Swap: {} paid {} {} for {} {} (fee {})",
        signer, amount, pay_mint, quote.amount_out, receive_mint, quote.fee
    );
    Ok(SwapReceipt {
        amount_in: amount,
        amount_out: quote.amount_out,
        fee: quote.fee,
    })
}
