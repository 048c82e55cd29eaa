//! Constant product invariant over every occupied reserve slot (K = Π r_i)

use crate::state::{Pool, TokenAccount};
use crate::store::{LedgerStore, Transaction};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use ptsol_common::{EngineError, EngineResult, BPS_SCALE};
use serde::{Deserialize, Serialize};

/// Value of K for a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantValue {
    /// No occupied slots
    Undefined,
    /// Exactly one slot; K is that reserve and carries no pricing meaning
    Degenerate(BigUint),
    /// Two or more slots
    Product(BigUint),
}

impl InvariantValue {
    pub fn from_reserves<I: IntoIterator<Item = u64>>(reserves: I) -> Self {
        let mut count = 0usize;
        let mut k = BigUint::from(1u8);
        for r in reserves {
            k *= r;
            count += 1;
        }
        match count {
            0 => InvariantValue::Undefined,
            1 => InvariantValue::Degenerate(k),
            _ => InvariantValue::Product(k),
        }
    }

    pub fn is_meaningful(&self) -> bool {
        matches!(self, InvariantValue::Product(_))
    }

    /// Numeric value, with `Undefined` read as zero
    pub fn value(&self) -> BigUint {
        match self {
            InvariantValue::Undefined => BigUint::zero(),
            InvariantValue::Degenerate(k) | InvariantValue::Product(k) => k.clone(),
        }
    }
}

impl core::fmt::Display for InvariantValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InvariantValue::Undefined => write!(f, "undefined"),
            InvariantValue::Degenerate(k) => write!(f, "{} (degenerate)", k),
            InvariantValue::Product(k) => write!(f, "{}", k),
        }
    }
}

/// Custody balances of the pool in slot order
pub fn pool_reserves<S: LedgerStore + ?Sized>(tx: &Transaction<'_, S>, pool: &Pool) -> EngineResult<Vec<u64>> {
    pool.slots
        .iter()
        .map(|slot| -> EngineResult<u64> {
            Ok(tx
                .load::<TokenAccount>(&slot.custody)?
                .map(|acct| acct.amount)
                .unwrap_or(0))
        })
        .collect()
}

/// K over the committed state of `store`. Pure read.
pub fn pool_invariant<S: LedgerStore + ?Sized>(store: &S, pool: &Pool) -> EngineResult<InvariantValue> {
    let tx = Transaction::new(store);
    Ok(InvariantValue::from_reserves(pool_reserves(&tx, pool)?))
}

/// Swap quote result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Amount of the receive asset paid out
    pub amount_out: u64,
    /// Part of the pay amount retained as fee
    pub fee: u64,
    pub new_pay_reserve: u64,
    pub new_receive_reserve: u64,
}

/// Quote paying `pay_amount` of an asset with reserve `pay_reserve` for an
/// asset with reserve `receive_reserve`.
///
/// With γ = 1 - fee:
/// - r = R·p·γ / (P + p·γ)
///
/// Decimals cancel between numerator and denominator, so the formula works
/// directly on minor units. Rounds down in favour of the pool.
pub fn quote_swap(pay_reserve: u64, receive_reserve: u64, pay_amount: u64, fee_bps: u64) -> EngineResult<SwapQuote> {
    if pay_amount == 0 {
        return Err(EngineError::InvalidSwapZeroAmount);
    }
    if fee_bps >= BPS_SCALE {
        return Err(EngineError::ConfigurationError(format!("swap fee {} bps out of range", fee_bps)));
    }
    if pay_reserve == 0 || receive_reserve == 0 {
        return Err(EngineError::InsufficientLiquidity);
    }

    let gamma = BPS_SCALE - fee_bps;
    // p·γ fits u128; R·p·γ may not
    let pay_net = BigUint::from(pay_amount as u128 * gamma as u128);
    let numerator = BigUint::from(receive_reserve) * &pay_net;
    let denominator = BigUint::from(pay_reserve as u128 * BPS_SCALE as u128) + &pay_net;
    let amount_out = (numerator / denominator).to_u64().ok_or(EngineError::MathOverflow)?;

    if amount_out == 0 {
        return Err(EngineError::InvalidSwapNotEnoughPay);
    }
    if amount_out >= receive_reserve {
        return Err(EngineError::InsufficientLiquidity);
    }

    let fee = (pay_amount as u128 * fee_bps as u128 / BPS_SCALE as u128) as u64;
    let new_pay_reserve = pay_reserve.checked_add(pay_amount).ok_or(EngineError::MathOverflow)?;

    Ok(SwapQuote {
        amount_out,
        fee,
        new_pay_reserve,
        new_receive_reserve: receive_reserve - amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptsol_common::to_minor_units;

    #[test]
    fn test_invariant_shapes() {
        assert_eq!(InvariantValue::from_reserves(Vec::new()), InvariantValue::Undefined);
        assert_eq!(
            InvariantValue::from_reserves([42]),
            InvariantValue::Degenerate(BigUint::from(42u8))
        );
        assert!(!InvariantValue::from_reserves([42]).is_meaningful());
        assert!(InvariantValue::from_reserves([2, 3]).is_meaningful());
        assert_eq!(InvariantValue::Undefined.value(), BigUint::zero());
    }

    #[test]
    fn test_invariant_two_asset_example() {
        let a = to_minor_units(8000, 9).unwrap();
        let b = to_minor_units(1000, 9).unwrap();
        let k = InvariantValue::from_reserves([a, b]);

        let expected = BigUint::from(8_000_000_000_000u64) * BigUint::from(1_000_000_000_000u64);
        assert_eq!(k, InvariantValue::Product(expected));
    }

    #[test]
    fn test_invariant_does_not_overflow() {
        // 11 max-size reserves is far past u128
        let k = InvariantValue::from_reserves([u64::MAX; 11]);
        assert!(k.value().bits() > 700);
    }

    #[test]
    fn test_quote_swap_basic() {
        // 1000 / 1000 pool, 1% fee, pay 10
        let q = quote_swap(1000, 1000, 10, 100).unwrap();
        // 1000·10·0.99 / (1000 + 9.9) = 9.80..
        assert_eq!(q.amount_out, 9);
        assert_eq!(q.fee, 0);
        assert_eq!(q.new_pay_reserve, 1010);
        assert_eq!(q.new_receive_reserve, 991);
    }

    #[test]
    fn test_quote_swap_matches_nominal_formula() {
        // Same ratio at different precisions yields the same nominal result
        let p = to_minor_units(10, 9).unwrap();
        let big = quote_swap(to_minor_units(8000, 9).unwrap(), to_minor_units(1000, 9).unwrap(), p, 100).unwrap();
        let small = quote_swap(8000, 1000, 10, 100).unwrap();
        assert_eq!(big.amount_out / 1_000_000_000, 1);
        assert_eq!(small.amount_out, 1);
    }

    #[test]
    fn test_quote_swap_preserves_k() {
        let (p0, r0) = (to_minor_units(8000, 9).unwrap(), to_minor_units(1000, 9).unwrap());
        let q = quote_swap(p0, r0, to_minor_units(250, 9).unwrap(), 100).unwrap();

        let before = BigUint::from(p0) * BigUint::from(r0);
        let after = BigUint::from(q.new_pay_reserve) * BigUint::from(q.new_receive_reserve);
        assert!(after >= before);
    }

    #[test]
    fn test_quote_swap_errors() {
        assert_eq!(quote_swap(1000, 1000, 0, 100), Err(EngineError::InvalidSwapZeroAmount));
        assert_eq!(quote_swap(1_000_000, 10, 1, 100), Err(EngineError::InvalidSwapNotEnoughPay));
        assert_eq!(quote_swap(0, 1000, 10, 100), Err(EngineError::InsufficientLiquidity));
        assert_eq!(quote_swap(1000, 0, 10, 100), Err(EngineError::InsufficientLiquidity));
        assert!(matches!(quote_swap(1000, 1000, 10, 10_000), Err(EngineError::ConfigurationError(_))));
    }

    #[test]
    fn test_quote_swap_never_drains() {
        let q = quote_swap(1, u64::MAX, u64::MAX - 1, 0).unwrap();
        assert_eq!(q.amount_out, u64::MAX - 1);
        assert_eq!(q.new_receive_reserve, 1);
    }

    #[test]
    fn test_higher_fee_pays_less() {
        let low = quote_swap(1_000_000, 1_000_000, 10_000, 5).unwrap();
        let high = quote_swap(1_000_000, 1_000_000, 10_000, 500).unwrap();
        assert!(high.amount_out < low.amount_out);
    }
}
