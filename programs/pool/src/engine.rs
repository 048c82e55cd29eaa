//! PoolEngine - owns configuration, store and scheduler and runs operations

use crate::config::EngineConfig;
use crate::instructions::{self, CancelOutcome, Context, FundOutcome, InitOutcome, ReconcileReport, ResumeOutcome, StakeReceipt, SwapReceipt, UnstakeReceipt};
use crate::math::{pool_invariant, InvariantValue};
use crate::scheduler::{AutomationScheduler, TaskHandle};
use crate::state::{Pool, RecordKind, StakeRecord, TokenAccount, VaultAccount};
use crate::store::LedgerStore;
use ptsol_common::{pool_pda, stake_info_pda, vault_pda, EngineError, EngineResult, FundingSchedule, TaskId};
use solana_program::{clock::Clock, pubkey::Pubkey};

pub struct PoolEngine<S: LedgerStore, A: AutomationScheduler> {
    config: EngineConfig,
    store: S,
    scheduler: A,
}

impl<S: LedgerStore, A: AutomationScheduler> PoolEngine<S, A> {
    pub fn new(config: EngineConfig, store: S, scheduler: A) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config, store, scheduler })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access for external collaborators (mint issuance)
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn scheduler(&self) -> &A {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut A {
        &mut self.scheduler
    }

    pub fn into_parts(self) -> (EngineConfig, S, A) {
        (self.config, self.store, self.scheduler)
    }

    fn context<'a>(&'a mut self, signer: &Pubkey, clock: &'a Clock) -> Context<'a, S, A> {
        Context {
            config: &self.config,
            store: &mut self.store,
            scheduler: &mut self.scheduler,
            signer: *signer,
            clock,
        }
    }

    fn read<T: RecordKind>(&self, address: &Pubkey) -> Option<&T> {
        self.store.get(address).and_then(T::from_record)
    }

    // ---- operations ----

    pub fn create_pool(&mut self, payer: &Pubkey, clock: &Clock) -> EngineResult<InitOutcome> {
        instructions::process_create_pool(&mut self.context(payer, clock))
    }

    pub fn fund_pool(
        &mut self,
        signer: &Pubkey,
        mint: Pubkey,
        source: Pubkey,
        quantity: u64,
        schedule: Option<FundingSchedule>,
        clock: &Clock,
    ) -> EngineResult<FundOutcome> {
        instructions::process_fund_pool(&mut self.context(signer, clock), mint, source, quantity, schedule)
    }

    pub fn swap(
        &mut self,
        signer: &Pubkey,
        pay_mint: Pubkey,
        receive_mint: Pubkey,
        payer_pay: Pubkey,
        payer_receive: Pubkey,
        amount: u64,
        clock: &Clock,
    ) -> EngineResult<SwapReceipt> {
        instructions::process_swap(
            &mut self.context(signer, clock),
            pay_mint,
            receive_mint,
            payer_pay,
            payer_receive,
            amount,
        )
    }

    pub fn initialize_staking(&mut self, signer: &Pubkey, mint: Pubkey, clock: &Clock) -> EngineResult<InitOutcome> {
        instructions::process_initialize_staking(&mut self.context(signer, clock), mint)
    }

    pub fn stake(
        &mut self,
        signer: &Pubkey,
        mint: Pubkey,
        source: Pubkey,
        amount: u64,
        task_id: TaskId,
        clock: &Clock,
    ) -> EngineResult<StakeReceipt> {
        instructions::process_stake(&mut self.context(signer, clock), mint, source, amount, task_id)
    }

    pub fn unstake(&mut self, signer: &Pubkey, destination: Pubkey, clock: &Clock) -> EngineResult<UnstakeReceipt> {
        instructions::process_unstake(&mut self.context(signer, clock), destination)
    }

    pub fn resume(&mut self, caller: &Pubkey, target: Pubkey, handle: TaskHandle, clock: &Clock) -> EngineResult<ResumeOutcome> {
        instructions::process_resume(&mut self.context(caller, clock), target, handle)
    }

    pub fn cancel_funding(&mut self, signer: &Pubkey, handle: TaskHandle, clock: &Clock) -> EngineResult<CancelOutcome> {
        instructions::process_cancel_funding(&mut self.context(signer, clock), handle)
    }

    pub fn reconcile(&self, clock: &Clock) -> ReconcileReport {
        instructions::process_reconcile(&self.config, &self.store, &self.scheduler, clock)
    }

    // ---- reads ----

    pub fn pool_address(&self) -> Pubkey {
        pool_pda(&self.config.program_id).0
    }

    pub fn vault_address(&self) -> Pubkey {
        vault_pda(&self.config.program_id).0
    }

    pub fn stake_address(&self, principal: &Pubkey) -> Pubkey {
        stake_info_pda(&self.config.program_id, principal).0
    }

    pub fn pool(&self) -> Option<&Pool> {
        self.read(&self.pool_address())
    }

    pub fn vault(&self) -> Option<&VaultAccount> {
        self.read(&self.vault_address())
    }

    pub fn stake_record(&self, principal: &Pubkey) -> Option<&StakeRecord> {
        self.read(&self.stake_address(principal))
    }

    pub fn token_account(&self, address: &Pubkey) -> Option<&TokenAccount> {
        self.read(address)
    }

    /// Reserve balance of `mint`, if the pool holds a slot for it
    pub fn reserve(&self, mint: &Pubkey) -> Option<u64> {
        let slot = self.pool()?.slot(mint)?;
        Some(self.token_account(&slot.custody).map(|a| a.amount).unwrap_or(0))
    }

    /// K over current reserves
    pub fn invariant(&self) -> EngineResult<InvariantValue> {
        let pool = self.pool().ok_or(EngineError::PoolNotInitialized)?;
        pool_invariant(&self.store, pool)
    }
}
