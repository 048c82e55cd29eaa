//! Harness shared by the integration suites
//!
//! Plays the external collaborators: the mint issuer writes `MintRecord`s and
//! seeds principals' token accounts; the scheduler is the in-memory double.

#![allow(dead_code)]

use ptsol_common::{token_account_address, to_minor_units};
use ptsol_pool::{EngineConfig, MemoryScheduler, MemoryStore, MintRecord, PoolEngine, Record, TokenAccount};
use solana_program::{clock::Clock, pubkey::Pubkey};

pub type Engine = PoolEngine<MemoryStore, MemoryScheduler>;

pub struct Harness {
    pub engine: Engine,
    pub now: i64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let engine = PoolEngine::new(config, MemoryStore::new(), MemoryScheduler::new()).unwrap();
        Self { engine, now: 1_700_000_000 }
    }

    pub fn clock(&self) -> Clock {
        Clock {
            slot: (self.now - 1_700_000_000) as u64,
            unix_timestamp: self.now,
            ..Clock::default()
        }
    }

    pub fn advance(&mut self, secs: i64) {
        self.now += secs;
    }

    pub fn mint(&mut self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.engine
            .store_mut()
            .insert(mint, Record::Mint(MintRecord { decimals }));
        mint
    }

    /// Credit `owner` with `amount` minor units of `mint`, creating the
    /// account if needed. Returns the account address.
    pub fn airdrop(&mut self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let address = token_account_address(&self.engine.config().program_id, owner, mint);
        let current = self.balance(&address);
        self.engine.store_mut().insert(
            address,
            Record::TokenAccount(TokenAccount {
                mint: *mint,
                owner: *owner,
                amount: current + amount,
            }),
        );
        address
    }

    /// Same as `airdrop`, in whole tokens
    pub fn airdrop_whole(&mut self, owner: &Pubkey, mint: &Pubkey, whole: u64, decimals: u8) -> Pubkey {
        self.airdrop(owner, mint, to_minor_units(whole, decimals).unwrap())
    }

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.engine.token_account(address).map(|a| a.amount).unwrap_or(0)
    }
}
