//! Program entrypoint

use crate::engine::PoolEngine;
use crate::instructions::InstructionOutcome;
use crate::scheduler::AutomationScheduler;
use crate::store::LedgerStore;
use log::{debug, error, warn};
use ptsol_common::{EngineInstruction, EngineResult};
use solana_program::{clock::Clock, pubkey::Pubkey};

/// Decode `instruction_data` and run it against the engine on behalf of `signer`
pub fn process_instruction<S, A>(
    engine: &mut PoolEngine<S, A>,
    signer: &Pubkey,
    instruction_data: &[u8],
    clock: &Clock,
) -> EngineResult<InstructionOutcome>
where
    S: LedgerStore,
    A: AutomationScheduler,
{
    let instruction = EngineInstruction::unpack(instruction_data).map_err(|e| {
        warn!("Error: could not decode {} instruction bytes", instruction_data.len());
        e
    })?;
    debug!("Dispatching {:?} for {}", instruction.tag(), signer);

    let result = dispatch(engine, signer, instruction, clock);
    if let Err(e) = &result {
        if e.is_fatal() {
            error!("ALERT: fatal engine error (code {}): {}", e.code(), e);
        } else {
            warn!("Instruction rejected (code {}): {}", e.code(), e);
        }
    }
    result
}

fn dispatch<S, A>(
    engine: &mut PoolEngine<S, A>,
    signer: &Pubkey,
    instruction: EngineInstruction,
    clock: &Clock,
) -> EngineResult<InstructionOutcome>
where
    S: LedgerStore,
    A: AutomationScheduler,
{
    Ok(match instruction {
        EngineInstruction::CreatePool => InstructionOutcome::PoolCreated(engine.create_pool(signer, clock)?),
        EngineInstruction::FundPool { mint, source, quantity, schedule } => {
            InstructionOutcome::Funded(engine.fund_pool(signer, mint, source, quantity, schedule, clock)?)
        }
        EngineInstruction::Swap { pay_mint, receive_mint, payer_pay, payer_receive, amount } => InstructionOutcome::Swapped(
            engine.swap(signer, pay_mint, receive_mint, payer_pay, payer_receive, amount, clock)?,
        ),
        EngineInstruction::InitializeStaking { mint } => {
            InstructionOutcome::StakingInitialized(engine.initialize_staking(signer, mint, clock)?)
        }
        EngineInstruction::Stake { mint, source, amount, task_id } => {
            InstructionOutcome::Staked(engine.stake(signer, mint, source, amount, task_id, clock)?)
        }
        EngineInstruction::Unstake { destination } => InstructionOutcome::Unstaked(engine.unstake(signer, destination, clock)?),
        EngineInstruction::Resume { target, handle } => {
            InstructionOutcome::Resumed(engine.resume(signer, target, handle, clock)?)
        }
        EngineInstruction::CancelFunding { handle } => {
            InstructionOutcome::FundingCancelled(engine.cancel_funding(signer, handle, clock)?)
        }
    })
}
