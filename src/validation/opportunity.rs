//! Pre-commit re-validation of an opportunity against fresh prices

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use crate::{
    arbitrage::SkipReason,
    types::{ArbitrageOpportunity, PoolSnapshot, ValidationResult},
    validation::validate_pool_impact,
};

/// What the fresh re-read produced.
pub enum MarketCheck<'a> {
    /// No usable fresh prices; the string says why.
    Unavailable(String),
    Assessed {
        outcome: &'a Result<ArbitrageOpportunity, SkipReason>,
        pools: &'a [&'a PoolSnapshot],
    },
}

pub fn revalidate_opportunity(
    original: &ArbitrageOpportunity,
    market: MarketCheck<'_>,
    max_pool_impact_pct: Decimal,
    now: DateTime<Utc>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    result.not_expired = !original.is_expired_at(now);
    if !result.not_expired {
        result.warnings.push(format!(
            "Opportunity expired {}ms ago",
            (now - original.valid_until).num_milliseconds()
        ));
    }

    match market {
        MarketCheck::Unavailable(reason) => {
            result.warnings.push(format!("Fresh prices unavailable: {}", reason));
        }
        MarketCheck::Assessed { outcome, pools } => {
            let fresh_buy_chain = match outcome {
                Ok(fresh) => Some(fresh.buy_chain),
                Err(reason) => reason.buy_chain(),
            };
            result.direction_unchanged = fresh_buy_chain == Some(original.buy_chain);
            if let Some(buy_chain) = fresh_buy_chain.filter(|c| *c != original.buy_chain) {
                result.warnings.push(format!(
                    "Direction flipped: {} is now the cheaper chain",
                    buy_chain
                ));
            }

            match outcome {
                Ok(fresh) => {
                    result.threshold_cleared = true;
                    result.profit_positive = fresh.net_profit > Decimal::ZERO;
                }
                Err(SkipReason::Unprofitable { .. }) => {
                    result.threshold_cleared = true;
                    result.warnings.push("Insufficient profit after costs".to_string());
                }
                Err(reason) => result.warnings.push(format!("Gap no longer tradeable: {}", reason)),
            }

            match validate_pool_impact(original.trade_size, pools, max_pool_impact_pct) {
                Ok(_) => result.pool_impact_acceptable = true,
                Err(warning) => result.warnings.push(warning),
            }
        }
    }

    result.all_passed = result.not_expired
        && result.threshold_cleared
        && result.direction_unchanged
        && result.profit_positive
        && result.pool_impact_acceptable;
    result
}
