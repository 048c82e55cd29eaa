//! Ledger records - one fixed-schema record per derived address

use ptsol_common::{checked_add, EngineError, EngineResult, TaskId, Trigger};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Any record the store can hold at an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Mint(MintRecord),
    TokenAccount(TokenAccount),
    Pool(Pool),
    Vault(VaultAccount),
    Stake(StakeRecord),
}

/// Typed view over `Record`
pub trait RecordKind: Sized + Clone {
    fn from_record(record: &Record) -> Option<&Self>;
    fn into_record(self) -> Record;
}

macro_rules! record_kind {
    ($ty:ty, $variant:ident) => {
        impl RecordKind for $ty {
            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    Record::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_record(self) -> Record {
                Record::$variant(self)
            }
        }
    };
}

record_kind!(MintRecord, Mint);
record_kind!(TokenAccount, TokenAccount);
record_kind!(Pool, Pool);
record_kind!(VaultAccount, Vault);
record_kind!(StakeRecord, Stake);

/// Asset definition, written by the external mint issuer. An asset is
/// recognized by the engine iff one of these exists at its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    pub decimals: u8,
}

/// Single-asset custodial balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccount {
    pub fn new(mint: Pubkey, owner: Pubkey) -> Self {
        Self { mint, owner, amount: 0 }
    }

    pub fn debit(&mut self, amount: u64) -> EngineResult<()> {
        if self.amount < amount {
            return Err(EngineError::InsufficientBalance {
                needed: amount,
                available: self.amount,
            });
        }
        self.amount -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: u64) -> EngineResult<()> {
        self.amount = checked_add(self.amount, amount)?;
        Ok(())
    }
}

/// One occupied reserve slot of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSlot {
    pub mint: Pubkey,
    /// Custodial token account, owned by the pool
    pub custody: Pubkey,
}

/// Liquidity pool
/// PDA: ["liquidity_pool"]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub bump: u8,
    /// Maximum number of distinct assets
    pub capacity: u8,
    /// Occupied slots in funding order; mints are unique
    pub slots: Vec<ReserveSlot>,
    /// Deferred fundings awaiting re-invocation
    pub pending: Vec<PendingTask>,
}

impl Pool {
    pub fn new(bump: u8, capacity: u8) -> Self {
        Self {
            bump,
            capacity,
            slots: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn slot(&self, mint: &Pubkey) -> Option<&ReserveSlot> {
        self.slots.iter().find(|s| s.mint == *mint)
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity as usize
    }

    /// Allocate a slot for a new asset. Existing assets are returned as-is.
    pub fn add_asset(&mut self, mint: Pubkey, custody: Pubkey) -> EngineResult<ReserveSlot> {
        if let Some(slot) = self.slot(&mint) {
            return Ok(*slot);
        }
        if self.is_full() {
            return Err(EngineError::PoolCapacityExceeded {
                capacity: self.capacity,
            });
        }
        let slot = ReserveSlot { mint, custody };
        self.slots.push(slot);
        Ok(slot)
    }

    pub fn pending_task(&self, handle: &Pubkey) -> Option<&PendingTask> {
        self.pending.iter().find(|t| t.handle == *handle)
    }

    pub fn take_pending(&mut self, handle: &Pubkey) -> Option<PendingTask> {
        let idx = self.pending.iter().position(|t| t.handle == *handle)?;
        Some(self.pending.remove(idx))
    }
}

/// Staking vault holding every principal's stake
/// PDA: ["vault"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccount {
    pub mint: Pubkey,
    pub balance: u64,
    /// Sum of all active stake records
    pub total_staked: u64,
    pub bump: u8,
}

impl VaultAccount {
    pub fn new(mint: Pubkey, bump: u8) -> Self {
        Self {
            mint,
            balance: 0,
            total_staked: 0,
            bump,
        }
    }
}

/// Per-principal stake
/// PDA: ["stake_info", principal]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub principal: Pubkey,
    pub staked_amount: u64,
    /// Unix timestamp of the first stake of the current cycle
    pub staked_at: i64,
    pub stake_at_slot: u64,
    /// Automated release registered with the scheduler
    pub pending_task: Option<PendingTask>,
    pub bump: u8,
}

impl StakeRecord {
    pub fn new(principal: Pubkey, bump: u8) -> Self {
        Self {
            principal,
            staked_amount: 0,
            staked_at: 0,
            stake_at_slot: 0,
            pending_task: None,
            bump,
        }
    }

    pub fn is_active(&self) -> bool {
        self.staked_amount > 0
    }
}

/// A registered future re-invocation, persisted in the record that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTask {
    /// Handle returned by the scheduler: ["thread", authority, task_id]
    pub handle: Pubkey,
    pub task_id: TaskId,
    pub trigger: Trigger,
    pub registered_at: i64,
    pub action: ResumeAction,
}

/// What to execute when the scheduler re-invokes the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeAction {
    /// Deferred FundPool leg, pre-authorized by `funder` at registration
    FundPool {
        funder: Pubkey,
        mint: Pubkey,
        source: Pubkey,
        quantity: u64,
    },
    /// Automated release of a principal's whole stake
    Release {
        principal: Pubkey,
        destination: Pubkey,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Funding,
    Release,
}

impl ResumeAction {
    pub fn kind(&self) -> TaskKind {
        match self {
            ResumeAction::FundPool { .. } => TaskKind::Funding,
            ResumeAction::Release { .. } => TaskKind::Release,
        }
    }
}
