//! Engine configuration

use ptsol_common::{pubkey_str, EngineError, EngineResult, BPS_SCALE};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Upper bound on pool slots; keeps the Pool record bounded
pub const MAX_POOL_CAPACITY: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program id every address is derived under
    #[serde(with = "pubkey_str")]
    pub program_id: Pubkey,

    /// Maximum number of distinct assets the pool holds
    pub pool_capacity: u8,

    /// Delay before a stake's automated release becomes due
    pub release_delay_secs: i64,

    /// Swap fee on the pay leg
    pub swap_fee_bps: u64,

    /// How long a pending task may stay overdue before reconciliation flags it
    pub stuck_task_grace_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program_id: crate::ID,
            pool_capacity: 11,
            release_delay_secs: 60,
            swap_fee_bps: 100, // 1%
            stuck_task_grace_secs: 300,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.pool_capacity == 0 || self.pool_capacity > MAX_POOL_CAPACITY {
            return Err(EngineError::ConfigurationError(format!(
                "pool_capacity must be 1..={}, got {}",
                MAX_POOL_CAPACITY, self.pool_capacity
            )));
        }
        if self.swap_fee_bps >= BPS_SCALE {
            return Err(EngineError::ConfigurationError(format!(
                "swap_fee_bps must be below {}, got {}",
                BPS_SCALE, self.swap_fee_bps
            )));
        }
        if self.release_delay_secs < 0 || self.stuck_task_grace_secs < 0 {
            return Err(EngineError::ConfigurationError(
                "delays must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
