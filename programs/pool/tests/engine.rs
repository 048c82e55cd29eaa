//! End-to-end engine behaviour over the in-memory store and scheduler

mod common;

use common::Harness;
use num_bigint::BigUint;
use ptsol_common::{to_minor_units, EngineError, EngineInstruction, FundingSchedule, TaskId, Trigger};
use ptsol_pool::{
    process_instruction, AutomationScheduler, EngineConfig, FundOutcome, InitOutcome, InstructionOutcome,
    InvariantValue, LedgerStore, ResumeOutcome, StuckReason, TaskKind,
};
use solana_program::pubkey::Pubkey;

#[test]
fn test_example_scenario() {
    let mut h = Harness::new();
    let admin = Pubkey::new_unique();
    let clock = h.clock();

    let hysol = h.mint(9);
    let ptsol = h.mint(9);
    let hysol_src = h.airdrop_whole(&admin, &hysol, 8000, 9);
    let ptsol_src = h.airdrop_whole(&admin, &ptsol, 1000, 9);

    assert_eq!(h.engine.invariant(), Err(EngineError::PoolNotInitialized));
    h.engine.create_pool(&admin, &clock).unwrap();
    assert_eq!(h.engine.invariant().unwrap(), InvariantValue::Undefined);

    let a = to_minor_units(8000, 9).unwrap();
    let b = to_minor_units(1000, 9).unwrap();
    h.engine.fund_pool(&admin, hysol, hysol_src, a, None, &clock).unwrap();
    assert!(!h.engine.invariant().unwrap().is_meaningful());
    h.engine.fund_pool(&admin, ptsol, ptsol_src, b, None, &clock).unwrap();

    assert_eq!(h.engine.reserve(&hysol), Some(8_000_000_000_000));
    assert_eq!(h.engine.reserve(&ptsol), Some(1_000_000_000_000));
    assert_eq!(
        h.engine.invariant().unwrap(),
        InvariantValue::Product(BigUint::from(8_000_000_000_000u64) * BigUint::from(1_000_000_000_000u64))
    );

    // Staking leg
    let principal = Pubkey::new_unique();
    let stake_mint = h.mint(9);
    let wallet = h.airdrop(&principal, &stake_mint, 1_000);
    h.engine.initialize_staking(&admin, stake_mint, &clock).unwrap();

    h.engine
        .stake(&principal, stake_mint, wallet, 100, TaskId::new("staking_thread_1").unwrap(), &clock)
        .unwrap();
    assert_eq!(h.balance(&wallet), 900);

    let receipt = h.engine.unstake(&principal, wallet, &clock).unwrap();
    assert_eq!(receipt.released, 100);
    assert_eq!(h.balance(&wallet), 1_000);
    assert_eq!(h.engine.stake_record(&principal).unwrap().staked_amount, 0);
    assert!(h.engine.reconcile(&clock).is_clean());
}

#[test]
fn test_funding_conservation_across_assets() {
    let mut h = Harness::new();
    let clock = h.clock();
    let funders: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
    let mints: Vec<Pubkey> = (0..4).map(|_| h.mint(6)).collect();
    h.engine.create_pool(&funders[0], &clock).unwrap();

    let mut sources = Vec::new();
    for f in &funders {
        for m in &mints {
            sources.push((*f, *m, h.airdrop(f, m, 1_000_000)));
        }
    }

    let mut funded = vec![0u64; mints.len()];
    for (round, (funder, mint, source)) in sources.iter().cycle().take(40).enumerate() {
        let quantity = 1_000 + (round as u64 * 7_919) % 20_000;
        h.engine.fund_pool(funder, *mint, *source, quantity, None, &clock).unwrap();
        let idx = mints.iter().position(|m| m == mint).unwrap();
        funded[idx] += quantity;
    }

    for (idx, mint) in mints.iter().enumerate() {
        assert_eq!(h.engine.reserve(mint), Some(funded[idx]));
        let drained: u64 = sources
            .iter()
            .filter(|(_, m, _)| m == mint)
            .map(|(_, _, src)| 1_000_000 - h.balance(src))
            .sum();
        assert_eq!(drained, funded[idx]);
    }
}

#[test]
fn test_invariant_non_decreasing_under_funding() {
    let mut h = Harness::new();
    let clock = h.clock();
    let funder = Pubkey::new_unique();
    h.engine.create_pool(&funder, &clock).unwrap();

    let mints: Vec<Pubkey> = (0..5).map(|_| h.mint(9)).collect();
    let sources: Vec<Pubkey> = mints.iter().map(|m| h.airdrop(&funder, m, u64::MAX / 2)).collect();

    let mut last = h.engine.invariant().unwrap().value();
    for round in 0..25u64 {
        let i = (round as usize * 3) % mints.len();
        h.engine
            .fund_pool(&funder, mints[i], sources[i], 1 + round * 1_000_003, None, &clock)
            .unwrap();
        let k = h.engine.invariant().unwrap().value();
        assert!(k >= last, "K decreased at round {}", round);
        last = k;
    }
}

#[test]
fn test_create_pool_idempotent() {
    let mut h = Harness::new();
    let clock = h.clock();
    let payer = Pubkey::new_unique();

    assert_eq!(h.engine.create_pool(&payer, &clock), Ok(InitOutcome::Created));
    let once = h.engine.store().clone();
    assert_eq!(h.engine.create_pool(&payer, &clock), Ok(InitOutcome::AlreadyInitialized));
    assert_eq!(h.engine.store(), &once);

    // Also after funding: the second call must not reset slots
    let mint = h.mint(9);
    let src = h.airdrop(&payer, &mint, 10);
    h.engine.fund_pool(&payer, mint, src, 10, None, &clock).unwrap();
    let funded = h.engine.store().clone();
    assert_eq!(
        h.engine.create_pool(&Pubkey::new_unique(), &clock),
        Ok(InitOutcome::AlreadyInitialized)
    );
    assert_eq!(h.engine.store(), &funded);
}

#[test]
fn test_unstake_without_stake_changes_nothing() {
    let mut h = Harness::new();
    let clock = h.clock();
    let principal = Pubkey::new_unique();
    let mint = h.mint(9);
    let wallet = h.airdrop(&principal, &mint, 10);
    h.engine.initialize_staking(&principal, mint, &clock).unwrap();
    let before = h.engine.store().clone();

    assert_eq!(h.engine.unstake(&principal, wallet, &clock), Err(EngineError::NoActiveStake));
    assert_eq!(h.engine.store(), &before);
}

#[test]
fn test_overdraw_changes_nothing() {
    let mut h = Harness::new();
    let clock = h.clock();
    let funder = Pubkey::new_unique();
    let mint = h.mint(9);
    let src = h.airdrop(&funder, &mint, 500);
    h.engine.create_pool(&funder, &clock).unwrap();
    h.engine.fund_pool(&funder, mint, src, 200, None, &clock).unwrap();
    let before = h.engine.store().clone();

    assert_eq!(
        h.engine.fund_pool(&funder, mint, src, 301, None, &clock),
        Err(EngineError::InsufficientBalance { needed: 301, available: 300 })
    );
    assert_eq!(h.engine.store(), &before);
    assert_eq!(h.balance(&src), 300);
    assert_eq!(h.engine.reserve(&mint), Some(200));
}

#[test]
fn test_eleven_asset_pool() {
    let mut h = Harness::new();
    let clock = h.clock();
    let admin = Pubkey::new_unique();
    h.engine.create_pool(&admin, &clock).unwrap();

    let supply: [(u64, u8); 11] = [
        (8000, 9),
        (1000, 9),
        (500, 6),
        (120, 8),
        (3, 9),
        (25_000, 6),
        (700, 9),
        (42, 2),
        (1_000_000, 0),
        (60, 9),
        (9, 9),
    ];
    for (whole, decimals) in supply {
        let mint = h.mint(decimals);
        let src = h.airdrop_whole(&admin, &mint, whole, decimals);
        h.engine
            .fund_pool(&admin, mint, src, to_minor_units(whole, decimals).unwrap(), None, &clock)
            .unwrap();
        assert_eq!(h.engine.reserve(&mint), Some(to_minor_units(whole, decimals).unwrap()));
    }
    assert!(h.engine.pool().unwrap().is_full());

    let twelfth = h.mint(9);
    let src = h.airdrop(&admin, &twelfth, 1);
    assert_eq!(
        h.engine.fund_pool(&admin, twelfth, src, 1, None, &clock),
        Err(EngineError::PoolCapacityExceeded { capacity: 11 })
    );
}

#[test]
fn test_swap_moves_both_legs_and_keeps_k() {
    let mut h = Harness::new();
    let clock = h.clock();
    let admin = Pubkey::new_unique();
    let trader = Pubkey::new_unique();

    let hysol = h.mint(9);
    let ptsol = h.mint(9);
    let a_src = h.airdrop_whole(&admin, &hysol, 8000, 9);
    let b_src = h.airdrop_whole(&admin, &ptsol, 1000, 9);
    h.engine.create_pool(&admin, &clock).unwrap();
    let (a_all, b_all) = (h.balance(&a_src), h.balance(&b_src));
    h.engine.fund_pool(&admin, hysol, a_src, a_all, None, &clock).unwrap();
    h.engine.fund_pool(&admin, ptsol, b_src, b_all, None, &clock).unwrap();

    let pay = h.airdrop_whole(&trader, &hysol, 80, 9);
    let receive = ptsol_common::token_account_address(&h.engine.config().program_id, &trader, &ptsol);
    let k_before = h.engine.invariant().unwrap().value();

    let receipt = h
        .engine
        .swap(&trader, hysol, ptsol, pay, receive, to_minor_units(80, 9).unwrap(), &clock)
        .unwrap();

    // ~ 1000·80·0.99 / (8000 + 79.2) ≈ 9.80 PTSOL
    assert!(receipt.amount_out > 9_790_000_000 && receipt.amount_out < 9_810_000_000);
    assert_eq!(receipt.fee, to_minor_units(80, 9).unwrap() / 100);
    assert_eq!(h.balance(&pay), 0);
    assert_eq!(h.balance(&receive), receipt.amount_out);
    assert_eq!(h.engine.reserve(&hysol), Some(to_minor_units(8080, 9).unwrap()));
    assert_eq!(
        h.engine.reserve(&ptsol),
        Some(to_minor_units(1000, 9).unwrap() - receipt.amount_out)
    );
    assert!(h.engine.invariant().unwrap().value() >= k_before);
}

#[test]
fn test_swap_rejections() {
    let mut h = Harness::new();
    let clock = h.clock();
    let admin = Pubkey::new_unique();
    let a = h.mint(9);
    let b = h.mint(9);
    let outsider = h.mint(9);
    let a_src = h.airdrop(&admin, &a, 1_000_000);
    let b_src = h.airdrop(&admin, &b, 1_000_000);
    h.engine.create_pool(&admin, &clock).unwrap();
    h.engine.fund_pool(&admin, a, a_src, 500_000, None, &clock).unwrap();
    h.engine.fund_pool(&admin, b, b_src, 500_000, None, &clock).unwrap();
    let before = h.engine.store().clone();

    assert_eq!(
        h.engine.swap(&admin, a, b, a_src, b_src, 0, &clock),
        Err(EngineError::InvalidSwapZeroAmount)
    );
    assert_eq!(
        h.engine.swap(&admin, a, a, a_src, a_src, 10, &clock),
        Err(EngineError::InvalidSwapMatchingAssets)
    );
    assert_eq!(
        h.engine.swap(&admin, outsider, b, a_src, b_src, 10, &clock),
        Err(EngineError::AssetNotRecognized(outsider))
    );
    assert_eq!(
        h.engine.swap(&admin, a, b, a_src, b_src, 1, &clock),
        Err(EngineError::InvalidSwapNotEnoughPay)
    );
    assert_eq!(
        h.engine.swap(&admin, a, b, a_src, b_src, 500_001, &clock),
        Err(EngineError::InsufficientBalance { needed: 500_001, available: 500_000 })
    );
    assert_eq!(h.engine.store(), &before);
}

#[test]
fn test_wire_level_flow_with_resume() {
    let mut h = Harness::new();
    let admin = Pubkey::new_unique();
    let keeper = Pubkey::new_unique();
    let mint = h.mint(9);
    let src = h.airdrop(&admin, &mint, 5_000);

    let clock = h.clock();
    process_instruction(&mut h.engine, &admin, &EngineInstruction::CreatePool.pack(), &clock).unwrap();

    let due = h.now + 30;
    let data = EngineInstruction::FundPool {
        mint,
        source: src,
        quantity: 5_000,
        schedule: Some(FundingSchedule {
            task_id: TaskId::new("fund_pool_thread").unwrap(),
            trigger: Trigger::Timestamp(due),
        }),
    }
    .pack();
    let outcome = process_instruction(&mut h.engine, &admin, &data, &clock).unwrap();
    let InstructionOutcome::Funded(FundOutcome::Scheduled { handle }) = outcome else {
        panic!("expected scheduled funding, got {:?}", outcome);
    };

    h.advance(30);
    let task = h.engine.scheduler_mut().fire(&handle).unwrap();
    let resume = EngineInstruction::Resume {
        target: task.target,
        handle: task.handle,
    }
    .pack();
    let clock = h.clock();
    assert_eq!(
        process_instruction(&mut h.engine, &keeper, &resume, &clock),
        Ok(InstructionOutcome::Resumed(ResumeOutcome::Funded {
            mint,
            quantity: 5_000,
            reserve: 5_000
        }))
    );
    assert_eq!(
        process_instruction(&mut h.engine, &keeper, &resume, &clock),
        Ok(InstructionOutcome::Resumed(ResumeOutcome::Stale))
    );
    assert_eq!(h.balance(&src), 0);
}

#[test]
fn test_reconcile_reports_lost_and_overdue_tasks() {
    let config = EngineConfig {
        stuck_task_grace_secs: 100,
        ..EngineConfig::default()
    };
    let mut h = Harness::with_config(config);
    let clock = h.clock();
    let admin = Pubkey::new_unique();
    let mint = h.mint(9);
    h.engine.initialize_staking(&admin, mint, &clock).unwrap();

    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let alice_wallet = h.airdrop(&alice, &mint, 100);
    let bob_wallet = h.airdrop(&bob, &mint, 100);
    let lost = h
        .engine
        .stake(&alice, mint, alice_wallet, 50, TaskId::new("alice").unwrap(), &clock)
        .unwrap();
    let late = h
        .engine
        .stake(&bob, mint, bob_wallet, 70, TaskId::new("bob").unwrap(), &clock)
        .unwrap();

    assert!(h.engine.reconcile(&clock).is_clean());

    // Scheduler loses alice's task; bob's is never delivered
    assert!(h.engine.scheduler_mut().drop_task(&lost.handle));
    h.advance(60 + 101);
    let clock = h.clock();
    let report = h.engine.reconcile(&clock);

    assert_eq!(report.pending_tasks, 2);
    assert_eq!(report.stuck.len(), 2);
    let alice_entry = report.stuck.iter().find(|s| s.handle == lost.handle).unwrap();
    assert_eq!(alice_entry.reason, StuckReason::Orphaned);
    assert_eq!(alice_entry.kind, TaskKind::Release);
    assert_eq!(alice_entry.target, h.engine.stake_address(&alice));
    let bob_entry = report.stuck.iter().find(|s| s.handle == late.handle).unwrap();
    assert_eq!(bob_entry.reason, StuckReason::Overdue { overdue_secs: 101 });
    assert!(report.vault_shortfall.is_none());

    // Stake funds stay intact and the principal can still exit manually
    assert!(h.engine.scheduler().is_live(&late.handle));
    h.engine.unstake(&alice, alice_wallet, &clock).unwrap();
    assert_eq!(h.balance(&alice_wallet), 100);
    assert_eq!(h.engine.store().records().count(), h.engine.store().len());
}
