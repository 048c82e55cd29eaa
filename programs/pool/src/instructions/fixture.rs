//! Shared setup for handler unit tests

use crate::config::EngineConfig;
use crate::engine::PoolEngine;
use crate::scheduler::MemoryScheduler;
use crate::state::{MintRecord, Record, TokenAccount};
use crate::store::MemoryStore;
use ptsol_common::token_account_address;
use solana_program::{clock::Clock, pubkey::Pubkey};

pub(crate) type TestEngine = PoolEngine<MemoryStore, MemoryScheduler>;

pub(crate) fn engine() -> TestEngine {
    PoolEngine::new(EngineConfig::default(), MemoryStore::new(), MemoryScheduler::new()).unwrap()
}

pub(crate) fn clock_at(unix_timestamp: i64) -> Clock {
    Clock {
        slot: unix_timestamp as u64 * 2,
        unix_timestamp,
        ..Clock::default()
    }
}

/// Register a new asset the way the mint issuer would
pub(crate) fn add_mint(engine: &mut TestEngine, decimals: u8) -> Pubkey {
    let mint = Pubkey::new_unique();
    engine.store_mut().insert(mint, Record::Mint(MintRecord { decimals }));
    mint
}

/// Give `owner` a token account for `mint` holding `amount`
pub(crate) fn give(engine: &mut TestEngine, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
    let address = token_account_address(&engine.config().program_id, owner, mint);
    engine.store_mut().insert(
        address,
        Record::TokenAccount(TokenAccount {
            mint: *mint,
            owner: *owner,
            amount,
        }),
    );
    address
}

pub(crate) fn balance(engine: &TestEngine, address: &Pubkey) -> u64 {
    engine.token_account(address).map(|a| a.amount).unwrap_or(0)
}
