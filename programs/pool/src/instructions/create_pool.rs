//! CreatePool instruction - initialize the singleton liquidity pool

use super::{Context, InitOutcome};
use crate::scheduler::AutomationScheduler;
use crate::state::Pool;
use crate::store::{LedgerStore, Transaction};
use log::{debug, info};
use ptsol_common::{pool_pda, EngineResult};

/// Initialize the pool with zero reserve slots.
///
/// A second call finds the existing record and succeeds without touching it.
pub fn process_create_pool<S, A>(ctx: &mut Context<'_, S, A>) -> EngineResult<InitOutcome>
where
    S: LedgerStore + ?Sized,
    A: AutomationScheduler + ?Sized,
{
    let (pool_addr, bump) = pool_pda(ctx.program_id());
    debug!("CreatePool: pool address {} (bump {})", pool_addr, bump);

    let mut tx = Transaction::new(&*ctx.store);

    if let Some(existing) = tx.load::<Pool>(&pool_addr)? {
        info!(
            "CreatePool: already initialized with {}/{} slots, skipping",
            existing.slots.len(),
            existing.capacity
        );
        return Ok(InitOutcome::AlreadyInitialized);
    }

    tx.put(pool_addr, Pool::new(bump, ctx.config.pool_capacity));
    let batch = tx.into_batch();
    ctx.store.apply(batch);

    info!(
        "CreatePool: initialized {} with capacity {} (payer {})",
        pool_addr, ctx.config.pool_capacity, ctx.signer
    );
    Ok(InitOutcome::Created)
}
