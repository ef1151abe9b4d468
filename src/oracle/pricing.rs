//! Spot price of a constant-product pool

use rust_decimal::prelude::*;
use crate::{
    errors::{BotError, BotResult},
    types::PoolSnapshot,
    utils::{bps_to_fraction, BPS_DENOMINATOR},
};

/// Quote-token per base-token, net of the pool fee:
/// `reserve_b / reserve_a * (1 - fee_bps / 10_000)`.
pub fn spot_price(snapshot: &PoolSnapshot) -> BotResult<Decimal> {
    let invalid = |reason: String| BotError::InvalidPoolState {
        chain_id: snapshot.chain_id,
        reason,
    };

    if snapshot.reserve_a <= Decimal::ZERO || snapshot.reserve_b <= Decimal::ZERO {
        return Err(invalid(format!(
            "non-positive reserves ({}, {})",
            snapshot.reserve_a, snapshot.reserve_b
        )));
    }
    if Decimal::from(snapshot.fee_bps) >= BPS_DENOMINATOR {
        return Err(invalid(format!("fee of {} bps leaves nothing to trade", snapshot.fee_bps)));
    }

    let raw = snapshot
        .reserve_b
        .checked_div(snapshot.reserve_a)
        .ok_or_else(|| invalid("reserve ratio overflows".to_string()))?;
    let fee = bps_to_fraction(snapshot.fee_bps);

    raw.checked_mul(Decimal::ONE - fee)
        .ok_or_else(|| invalid("price overflows".to_string()))
}
