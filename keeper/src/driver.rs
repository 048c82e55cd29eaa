//! Automation driver
//!
//! Each tick hands due registrations back to the engine as `Resume`
//! instructions, then reconciles. A delivery is consumed whether or not the
//! resume succeeds; failed tasks stay on their record and surface in the
//! reconciliation report as orphaned.

use crate::priority_queue::TaskQueue;
use crate::tx_builder::build_resume_batch;
use ptsol_common::{thread_authority_pda, EngineError};
use ptsol_pool::{
    process_instruction, InstructionOutcome, MemoryStore, PoolEngine, ReconcileReport, ResumeOutcome, TaskHandle,
};
use solana_program::{clock::Clock, pubkey::Pubkey};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub type KeeperEngine = PoolEngine<MemoryStore, TaskQueue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("fatal engine error while resuming task {handle}: {source}")]
    Fatal {
        handle: TaskHandle,
        #[source]
        source: EngineError,
    },
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    pub funded: usize,
    pub released: usize,
    pub stale: usize,
    pub failed: Vec<(TaskHandle, EngineError)>,
    pub reconcile: ReconcileReport,
}

impl TickReport {
    /// Any delivery mutates the queue, successful or not
    pub fn changed_state(&self) -> bool {
        self.delivered > 0
    }

    /// First fatal failure, if any; the keeper stops on it
    pub fn escalate(&self) -> Result<(), DriverError> {
        match self.failed.iter().find(|(_, e)| e.is_fatal()) {
            Some((handle, e)) => Err(DriverError::Fatal {
                handle: *handle,
                source: e.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub struct Driver {
    engine: KeeperEngine,
    /// Identity the keeper signs resumes with
    keeper: Pubkey,
    max_tasks_per_tick: usize,
}

impl Driver {
    pub fn new(engine: KeeperEngine, max_tasks_per_tick: usize) -> Self {
        let (keeper, _) = thread_authority_pda(&engine.config().program_id);
        Self {
            engine,
            keeper,
            max_tasks_per_tick,
        }
    }

    pub fn engine(&self) -> &KeeperEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut KeeperEngine {
        &mut self.engine
    }

    pub fn keeper(&self) -> &Pubkey {
        &self.keeper
    }

    pub fn tick(&mut self, clock: &Clock) -> TickReport {
        let mut report = TickReport::default();
        let program_id = self.engine.config().program_id;

        let due = self
            .engine
            .scheduler_mut()
            .pop_due(clock, self.max_tasks_per_tick);
        if !due.is_empty() {
            log::info!("Delivering {} due task(s)", due.len());
        }

        for (task, ix) in due.iter().zip(build_resume_batch(&program_id, &due, &self.keeper)) {
            report.delivered += 1;

            match process_instruction(&mut self.engine, &self.keeper, &ix.data, clock) {
                Ok(InstructionOutcome::Resumed(ResumeOutcome::Funded { mint, quantity, reserve })) => {
                    log::info!("Deferred funding {}: +{} of {} (reserve {})", task.handle, quantity, mint, reserve);
                    report.funded += 1;
                }
                Ok(InstructionOutcome::Resumed(ResumeOutcome::Released(receipt))) => {
                    log::info!(
                        "Automated release {}: {} returned to {}",
                        task.handle,
                        receipt.released,
                        receipt.principal
                    );
                    report.released += 1;
                }
                Ok(InstructionOutcome::Resumed(ResumeOutcome::Stale)) => {
                    report.stale += 1;
                }
                Ok(other) => {
                    log::warn!("Unexpected outcome for task {}: {:?}", task.handle, other);
                }
                Err(e) => {
                    if e.is_fatal() {
                        log::error!("ALERT: task {} on {} hit a fatal error: {}", task.handle, task.target, e);
                    } else {
                        log::warn!("Task {} on {} failed: {}", task.handle, task.target, e);
                    }
                    report.failed.push((task.handle, e));
                }
            }
        }

        report.reconcile = self.engine.reconcile(clock);
        if !report.reconcile.is_clean() {
            log::warn!(
                "Reconciliation: {} pending, {} stuck, vault shortfall: {}",
                report.reconcile.pending_tasks,
                report.reconcile.stuck.len(),
                report.reconcile.vault_shortfall.is_some()
            );
        } else {
            log::debug!("Reconciliation clean: {} pending", report.reconcile.pending_tasks);
        }

        report
    }
}

/// Wall-clock reading; the keeper has no ledger slot, so ticks stand in for it
pub fn wall_clock(slot: u64) -> Clock {
    let unix_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    Clock {
        slot,
        unix_timestamp,
        ..Clock::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptsol_common::{EngineInstruction, FundingSchedule, TaskId, Trigger};
    use ptsol_pool::{AutomationScheduler, EngineConfig, MintRecord, Record, StuckReason, TokenAccount};

    const START: i64 = 1_700_000_000;

    fn clock_at(ts: i64) -> Clock {
        Clock {
            slot: (ts - START) as u64,
            unix_timestamp: ts,
            ..Clock::default()
        }
    }

    struct Setup {
        driver: Driver,
        principal: Pubkey,
        mint: Pubkey,
        wallet: Pubkey,
    }

    fn setup(max: usize) -> Setup {
        let engine = PoolEngine::new(EngineConfig::default(), MemoryStore::new(), TaskQueue::new()).unwrap();
        let mut driver = Driver::new(engine, max);
        let principal = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let program_id = driver.engine().config().program_id;
        let wallet = ptsol_common::token_account_address(&program_id, &principal, &mint);

        let store = driver.engine_mut().store_mut();
        store.insert(mint, Record::Mint(MintRecord { decimals: 9 }));
        store.insert(
            wallet,
            Record::TokenAccount(TokenAccount {
                mint,
                owner: principal,
                amount: 1_000,
            }),
        );
        Setup {
            driver,
            principal,
            mint,
            wallet,
        }
    }

    fn balance(driver: &Driver, address: &Pubkey) -> u64 {
        driver.engine().token_account(address).map(|a| a.amount).unwrap_or(0)
    }

    #[test]
    fn test_idle_tick() {
        let mut s = setup(4);
        let report = s.driver.tick(&clock_at(START));
        assert_eq!(report.delivered, 0);
        assert!(!report.changed_state());
        assert!(report.reconcile.is_clean());
    }

    #[test]
    fn test_releases_stake_when_due() {
        let mut s = setup(4);
        let engine = s.driver.engine_mut();
        engine.initialize_staking(&s.principal, s.mint, &clock_at(START)).unwrap();
        let receipt = engine
            .stake(&s.principal, s.mint, s.wallet, 400, TaskId::new("staking_thread").unwrap(), &clock_at(START))
            .unwrap();
        assert_eq!(balance(&s.driver, &s.wallet), 600);

        // Not yet due
        let early = s.driver.tick(&clock_at(START + 59));
        assert_eq!(early.delivered, 0);
        assert!(s.driver.engine().scheduler().is_live(&receipt.handle));

        let report = s.driver.tick(&clock_at(START + 60));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.released, 1);
        assert!(report.failed.is_empty());
        assert!(report.reconcile.is_clean());
        assert_eq!(balance(&s.driver, &s.wallet), 1_000);
        assert!(s.driver.engine().scheduler().is_empty());
    }

    #[test]
    fn test_deferred_funding_through_wire() {
        let mut s = setup(4);
        let clock = clock_at(START);
        let data = EngineInstruction::FundPool {
            mint: s.mint,
            source: s.wallet,
            quantity: 250,
            schedule: Some(FundingSchedule {
                task_id: TaskId::new("fund_later").unwrap(),
                trigger: Trigger::Timestamp(START + 10),
            }),
        }
        .pack();

        let principal = s.principal;
        process_instruction(s.driver.engine_mut(), &principal, &EngineInstruction::CreatePool.pack(), &clock).unwrap();
        process_instruction(s.driver.engine_mut(), &principal, &data, &clock).unwrap();
        assert_eq!(s.driver.engine().scheduler().len(), 1);

        let report = s.driver.tick(&clock_at(START + 10));
        assert_eq!(report.funded, 1);
        assert_eq!(s.driver.engine().reserve(&s.mint), Some(250));
        assert_eq!(balance(&s.driver, &s.wallet), 750);
    }

    #[test]
    fn test_failed_resume_reported_as_orphaned() {
        let mut s = setup(4);
        let clock = clock_at(START);
        let engine = s.driver.engine_mut();
        engine.create_pool(&s.principal, &clock).unwrap();
        let schedule = FundingSchedule {
            task_id: TaskId::new("fund_now").unwrap(),
            trigger: Trigger::Immediate,
        };
        engine
            .fund_pool(&s.principal, s.mint, s.wallet, 900, Some(schedule), &clock)
            .unwrap();

        // Principal drains the wallet before delivery
        engine.store_mut().insert(
            s.wallet,
            Record::TokenAccount(TokenAccount {
                mint: s.mint,
                owner: s.principal,
                amount: 5,
            }),
        );

        let report = s.driver.tick(&clock);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, EngineError::InsufficientBalance { .. }));
        assert!(report.escalate().is_ok());
        assert_eq!(report.reconcile.stuck.len(), 1);
        assert_eq!(report.reconcile.stuck[0].reason, StuckReason::Orphaned);

        // Nothing is redelivered
        assert_eq!(s.driver.tick(&clock_at(START + 1)).delivered, 0);
    }

    #[test]
    fn test_fatal_failure_escalates() {
        let mut s = setup(4);
        let clock = clock_at(START);
        let engine = s.driver.engine_mut();
        engine.initialize_staking(&s.principal, s.mint, &clock).unwrap();
        let receipt = engine
            .stake(&s.principal, s.mint, s.wallet, 100, TaskId::new("t").unwrap(), &clock)
            .unwrap();

        let vault_addr = engine.vault_address();
        let mut vault = *engine.vault().unwrap();
        vault.balance = 10;
        engine.store_mut().insert(vault_addr, Record::Vault(vault));

        let report = s.driver.tick(&clock_at(START + 60));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.escalate(),
            Err(DriverError::Fatal {
                handle: receipt.handle,
                source: EngineError::VaultUnderfunded { balance: 10, staked: 100 },
            })
        );
        assert!(report.reconcile.vault_shortfall.is_some());
    }

    #[test]
    fn test_tick_limit() {
        let mut s = setup(1);
        let clock = clock_at(START);
        let engine = s.driver.engine_mut();
        engine.create_pool(&s.principal, &clock).unwrap();
        for name in ["a", "b", "c"] {
            let schedule = FundingSchedule {
                task_id: TaskId::new(name).unwrap(),
                trigger: Trigger::Immediate,
            };
            engine
                .fund_pool(&s.principal, s.mint, s.wallet, 10, Some(schedule), &clock)
                .unwrap();
        }

        assert_eq!(s.driver.tick(&clock).delivered, 1);
        assert_eq!(s.driver.tick(&clock).delivered, 1);
        assert_eq!(s.driver.tick(&clock).delivered, 1);
        assert_eq!(s.driver.tick(&clock).delivered, 0);
        assert_eq!(s.driver.engine().reserve(&s.mint), Some(30));
    }
}
