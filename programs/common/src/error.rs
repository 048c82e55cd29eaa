//! Error taxonomy shared by every engine operation

use solana_program::pubkey::Pubkey;
use thiserror::Error;

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

/// Every failure aborts the whole operation; no partial debit/credit is ever
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed seed tag, task identifier or engine configuration
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("pool capacity of {capacity} assets exceeded")]
    PoolCapacityExceeded { capacity: u8 },

    #[error("asset {0} not recognized")]
    AssetNotRecognized(Pubkey),

    #[error("task identifier already in use by a live task")]
    DuplicateTaskIdentifier,

    #[error("no active stake")]
    NoActiveStake,

    /// Vault and stake registry have diverged
    #[error("vault underfunded: balance {balance}, staked {staked}")]
    VaultUnderfunded { balance: u64, staked: u64 },

    #[error("liquidity pool not initialized")]
    PoolNotInitialized,

    #[error("staking vault not initialized")]
    StakingNotInitialized,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("signer is not authorized for this account")]
    Unauthorized,

    #[error("account holds a record of a different kind")]
    AccountKindMismatch,

    #[error("arithmetic overflow")]
    MathOverflow,

    #[error("invalid instruction data")]
    InvalidInstruction,

    #[error("swap amount must be greater than zero")]
    InvalidSwapZeroAmount,

    #[error("cannot swap an asset for itself")]
    InvalidSwapMatchingAssets,

    #[error("swap pays too little to receive anything")]
    InvalidSwapNotEnoughPay,

    #[error("pool does not hold enough liquidity")]
    InsufficientLiquidity,

    /// Constant-product invariant would decrease
    #[error("constant-product invariant violated")]
    InvariantViolated,

    #[error("task trigger has not fired yet")]
    TaskNotDue,
}

impl EngineError {
    /// Internal consistency violations. These indicate prior corruption and
    /// must be escalated, never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::VaultUnderfunded { .. } | EngineError::InvariantViolated
        )
    }

    /// Rejections the caller can fix and resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientBalance { .. }
                | EngineError::PoolCapacityExceeded { .. }
                | EngineError::AssetNotRecognized(_)
                | EngineError::DuplicateTaskIdentifier
                | EngineError::NoActiveStake
                | EngineError::ZeroAmount
                | EngineError::TaskNotDue
                | EngineError::InvalidSwapZeroAmount
                | EngineError::InvalidSwapNotEnoughPay
                | EngineError::InsufficientLiquidity
        )
    }

    /// Stable numeric code, in the style of a program's custom error codes
    pub fn code(&self) -> u32 {
        match self {
            EngineError::ConfigurationError(_) => 0,
            EngineError::InsufficientBalance { .. } => 1,
            EngineError::PoolCapacityExceeded { .. } => 2,
            EngineError::AssetNotRecognized(_) => 3,
            EngineError::DuplicateTaskIdentifier => 4,
            EngineError::NoActiveStake => 5,
            EngineError::VaultUnderfunded { .. } => 6,
            EngineError::PoolNotInitialized => 7,
            EngineError::StakingNotInitialized => 8,
            EngineError::ZeroAmount => 9,
            EngineError::Unauthorized => 10,
            EngineError::AccountKindMismatch => 11,
            EngineError::MathOverflow => 12,
            EngineError::InvalidInstruction => 13,
            EngineError::InvalidSwapZeroAmount => 14,
            EngineError::InvalidSwapMatchingAssets => 15,
            EngineError::InvalidSwapNotEnoughPay => 16,
            EngineError::InsufficientLiquidity => 17,
            EngineError::InvariantViolated => 18,
            EngineError::TaskNotDue => 19,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_are_not_retryable() {
        let fatal = [
            EngineError::VaultUnderfunded { balance: 0, staked: 1 },
            EngineError::InvariantViolated,
        ];
        for e in fatal.iter() {
            assert!(e.is_fatal());
            assert!(!e.is_retryable());
        }
    }

    #[test]
    fn test_caller_errors_are_retryable() {
        assert!(EngineError::NoActiveStake.is_retryable());
        assert!(EngineError::InsufficientBalance { needed: 2, available: 1 }.is_retryable());
        assert!(!EngineError::NoActiveStake.is_fatal());
        assert!(!EngineError::ConfigurationError("empty seed".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let e = EngineError::InsufficientBalance { needed: 100, available: 40 };
        assert_eq!(e.to_string(), "insufficient balance: needed 100, available 40");
        assert_eq!(EngineError::PoolCapacityExceeded { capacity: 11 }.code(), 2);
    }
}
