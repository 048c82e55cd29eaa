//! Instruction handlers
//!
//! Each handler stages its reads and writes on one `Transaction` and applies
//! the batch only after every check has passed. Scheduler registrations are
//! made last, immediately before the batch is applied.

pub mod cancel_funding;
pub mod create_pool;
pub mod fund_pool;
pub mod initialize_staking;
pub mod reconcile;
pub mod resume;
pub mod stake;
pub mod swap;
pub mod unstake;

pub use cancel_funding::*;
pub use create_pool::*;
pub use fund_pool::*;
pub use initialize_staking::*;
pub use reconcile::*;
pub use resume::*;
pub use stake::*;
pub use swap::*;
pub use unstake::*;

use crate::config::EngineConfig;
use crate::scheduler::AutomationScheduler;
use crate::store::LedgerStore;
use ptsol_common::thread_authority_pda;
use solana_program::{clock::Clock, pubkey::Pubkey};

/// Everything a handler may touch during one operation
pub struct Context<'a, S: LedgerStore + ?Sized, A: AutomationScheduler + ?Sized> {
    pub config: &'a EngineConfig,
    pub store: &'a mut S,
    pub scheduler: &'a mut A,
    /// Principal that signed the request
    pub signer: Pubkey,
    pub clock: &'a Clock,
}

impl<'a, S: LedgerStore + ?Sized, A: AutomationScheduler + ?Sized> Context<'a, S, A> {
    pub fn program_id(&self) -> &Pubkey {
        &self.config.program_id
    }

    /// Authority every deferred task is registered under
    pub fn thread_authority(&self) -> Pubkey {
        thread_authority_pda(&self.config.program_id).0
    }
}

/// Result of an idempotent initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    /// Record already present; nothing was written
    AlreadyInitialized,
}

/// Result of any dispatched instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionOutcome {
    PoolCreated(InitOutcome),
    Funded(FundOutcome),
    Swapped(SwapReceipt),
    StakingInitialized(InitOutcome),
    Staked(StakeReceipt),
    Unstaked(UnstakeReceipt),
    Resumed(ResumeOutcome),
    FundingCancelled(CancelOutcome),
}

#[cfg(test)]
pub(crate) mod fixture;
