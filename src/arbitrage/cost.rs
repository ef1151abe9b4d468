//! Trade cost estimation

use rust_decimal::prelude::*;
use std::collections::HashMap;
use crate::{types::ChainId, utils::bps_to_fraction};

/// Costs of one round trip, in quote-token units.
#[derive(Debug, Clone)]
pub struct CostModel {
    /// Fixed gas estimate for one swap on each chain.
    pub gas_cost: HashMap<ChainId, Decimal>,
    /// Fee tier charged on notional, on top of the pool fee already in the quote.
    pub fee_tier_bps: u32,
    /// Safety margin for slippage, proportional to notional.
    pub slippage_margin_bps: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            gas_cost: HashMap::new(),
            fee_tier_bps: 0,
            slippage_margin_bps: 20,
        }
    }
}

impl CostModel {
    pub fn gas_on(&self, chain_id: ChainId) -> Decimal {
        self.gas_cost.get(&chain_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Gas on both chains plus fee tier and slippage margin on
    /// `trade_size * buy_price`.
    pub fn estimate(
        &self,
        buy_chain: ChainId,
        sell_chain: ChainId,
        trade_size: Decimal,
        buy_price: Decimal,
    ) -> Decimal {
        let notional = trade_size * buy_price;
        let gas = self.gas_on(buy_chain) + self.gas_on(sell_chain);
        let fees = notional * bps_to_fraction(self.fee_tier_bps);
        let slippage = notional * bps_to_fraction(self.slippage_margin_bps);
        gas + fees + slippage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_estimate_components() {
        let model = CostModel {
            gas_cost: HashMap::from([(ChainId(1), dec!(0.05)), (ChainId(2), dec!(0.10))]),
            fee_tier_bps: 5,
            slippage_margin_bps: 20,
        };
        // notional 20: gas 0.15, fee 0.01, slippage 0.04
        assert_eq!(model.estimate(ChainId(1), ChainId(2), dec!(10), dec!(2)), dec!(0.20));
    }

    #[test]
    fn test_slippage_scales_with_size() {
        let model = CostModel::default();
        let small = model.estimate(ChainId(1), ChainId(2), dec!(1), dec!(2));
        let large = model.estimate(ChainId(1), ChainId(2), dec!(10), dec!(2));
        assert_eq!(large, small * dec!(10));
    }
}
