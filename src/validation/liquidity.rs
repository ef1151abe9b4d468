//! Pool depth checks

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::types::PoolSnapshot;

/// Trade size as a percentage of the pool's base reserve.
pub fn pool_impact_pct(trade_size: Decimal, pool: &PoolSnapshot) -> Option<Decimal> {
    if pool.reserve_a <= Decimal::ZERO {
        return None;
    }
    trade_size.checked_div(pool.reserve_a).map(|share| share * dec!(100))
}

/// Largest impact across `pools`, or a warning when one cannot be computed.
pub fn validate_pool_impact(
    trade_size: Decimal,
    pools: &[&PoolSnapshot],
    max_impact_pct: Decimal,
) -> Result<Decimal, String> {
    let mut worst = Decimal::ZERO;
    for pool in pools {
        let impact = pool_impact_pct(trade_size, pool)
            .ok_or_else(|| format!("{} pool has no base liquidity", pool.chain_id))?;
        if impact > max_impact_pct {
            return Err(format!(
                "Trade size is {:.2}% of {} pool liquidity (max {}%)",
                impact, pool.chain_id, max_impact_pct
            ));
        }
        worst = worst.max(impact);
    }
    Ok(worst)
}
