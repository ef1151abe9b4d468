//! Mathematical utility functions

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;

pub const BPS_DENOMINATOR: Decimal = dec!(10000);

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

/// Basis points as a fraction, e.g. 30 -> 0.003.
pub fn bps_to_fraction(bps: u32) -> Decimal {
    Decimal::from(bps) / BPS_DENOMINATOR
}

/// Raw on-chain amount to whole tokens. `None` when the value does not fit a `Decimal`.
pub fn u256_to_decimal(raw: U256, decimals: u32) -> Option<Decimal> {
    let value = Decimal::from_str(&raw.to_string()).ok()?;
    value.checked_div(pow10(decimals as i32))
}

/// Whole tokens to a raw on-chain amount, truncating dust below one unit.
pub fn decimal_to_u256(amount: Decimal, decimals: u32) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let scaled = amount.checked_mul(pow10(decimals as i32))?.trunc();
    scaled.to_u128().map(U256::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(3), dec!(1000));
        assert_eq!(pow10(-2), dec!(0.01));
        assert_eq!(pow10(18), dec!(1_000_000_000_000_000_000));
    }

    #[test]
    fn test_u256_conversions() {
        let raw = U256::from(1_500_000u64);
        assert_eq!(u256_to_decimal(raw, 6), Some(dec!(1.5)));
        assert_eq!(decimal_to_u256(dec!(1.5), 6), Some(raw));
        assert_eq!(decimal_to_u256(dec!(0.0000001), 6), Some(U256::ZERO));
        assert_eq!(decimal_to_u256(dec!(-1), 6), None);
    }

    #[test]
    fn test_bps_fraction() {
        assert_eq!(bps_to_fraction(30), dec!(0.003));
        assert_eq!(bps_to_fraction(0), Decimal::ZERO);
    }
}
