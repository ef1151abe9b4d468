//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::ChainId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub buy_chain: ChainId,
    pub sell_chain: ChainId,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// Base-token amount bought on `buy_chain` and sold on `sell_chain`.
    pub trade_size: Decimal,
    pub price_difference_pct: Decimal,
    pub estimated_gross_profit: Decimal,
    /// Gas on both chains plus fee tier plus slippage margin, in quote-token units.
    pub estimated_cost: Decimal,
    /// Gross profit minus `estimated_cost`. Always positive for an emitted opportunity.
    pub net_profit: Decimal,
    pub detected_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    pub fn direction(&self) -> String {
        format!("Buy on {} → Sell on {}", self.buy_chain, self.sell_chain)
    }
}
