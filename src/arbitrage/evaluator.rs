//! Opportunity evaluation from two chains' quotes

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::{
    arbitrage::CostModel,
    health::HealthTracker,
    types::{ArbitrageOpportunity, ChainId, PriceQuote},
    utils::chrono_duration,
};

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Price gap, in percent of the buy price, that must be exceeded.
    pub min_price_diff_pct: Decimal,
    /// Base-token amount per opportunity.
    pub trade_size: Decimal,
    pub freshness_bound: Duration,
    /// Largest allowed gap between the two quotes' `computed_at`.
    pub max_quote_skew: Duration,
    pub max_opportunity_age: Duration,
    pub cost_model: CostModel,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            min_price_diff_pct: dec!(0.5),
            trade_size: dec!(0.1),
            freshness_bound: Duration::from_secs(3),
            max_quote_skew: Duration::from_secs(2),
            max_opportunity_age: Duration::from_secs(3),
            cost_model: CostModel::default(),
        }
    }
}

/// Why a pair of quotes produced no opportunity.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    SameChain,
    Stale { chain_id: ChainId },
    Skewed { skew: chrono::Duration },
    ChainDown { chain_id: ChainId },
    BelowThreshold { pct: Decimal, buy_chain: ChainId },
    Unprofitable { net_profit: Decimal, buy_chain: ChainId },
}

impl SkipReason {
    /// Direction the quotes pointed at, when pricing got that far.
    pub fn buy_chain(&self) -> Option<ChainId> {
        match self {
            SkipReason::BelowThreshold { buy_chain, .. }
            | SkipReason::Unprofitable { buy_chain, .. } => Some(*buy_chain),
            _ => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SameChain => write!(f, "both quotes come from the same chain"),
            SkipReason::Stale { chain_id } => write!(f, "quote for {} is stale", chain_id),
            SkipReason::Skewed { skew } => {
                write!(f, "quotes are {}ms apart", skew.num_milliseconds())
            }
            SkipReason::ChainDown { chain_id } => write!(f, "{} is down", chain_id),
            SkipReason::BelowThreshold { pct, .. } => {
                write!(f, "price gap {:.3}% does not clear the threshold", pct)
            }
            SkipReason::Unprofitable { net_profit, .. } => {
                write!(f, "net profit {:.6} after costs", net_profit)
            }
        }
    }
}

pub struct OpportunityEvaluator {
    config: EvaluatorConfig,
    health: Arc<HealthTracker>,
}

impl OpportunityEvaluator {
    pub fn new(config: EvaluatorConfig, health: Arc<HealthTracker>) -> Self {
        Self { config, health }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn evaluate(&self, quote_a: &PriceQuote, quote_b: &PriceQuote) -> Option<ArbitrageOpportunity> {
        self.evaluate_at(quote_a, quote_b, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        quote_a: &PriceQuote,
        quote_b: &PriceQuote,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        match self.assess_at(quote_a, quote_b, now) {
            Ok(opportunity) => Some(opportunity),
            Err(reason) => {
                debug!("No opportunity: {}", reason);
                None
            }
        }
    }

    /// Like `evaluate_at`, but says why nothing was emitted.
    pub fn assess_at(
        &self,
        quote_a: &PriceQuote,
        quote_b: &PriceQuote,
        now: DateTime<Utc>,
    ) -> Result<ArbitrageOpportunity, SkipReason> {
        if quote_a.chain_id == quote_b.chain_id {
            return Err(SkipReason::SameChain);
        }

        let freshness = chrono_duration(self.config.freshness_bound);
        for quote in [quote_a, quote_b] {
            if quote.is_stale_at(now, freshness) {
                return Err(SkipReason::Stale { chain_id: quote.chain_id });
            }
        }

        let skew = (quote_a.computed_at - quote_b.computed_at).abs();
        if skew > chrono_duration(self.config.max_quote_skew) {
            return Err(SkipReason::Skewed { skew });
        }

        for quote in [quote_a, quote_b] {
            if self.health.is_down_at(quote.chain_id, now) {
                return Err(SkipReason::ChainDown { chain_id: quote.chain_id });
            }
        }

        let a_is_cheaper = quote_a.price < quote_b.price
            || (quote_a.price == quote_b.price && quote_a.chain_id < quote_b.chain_id);
        let (buy, sell) = if a_is_cheaper {
            (quote_a, quote_b)
        } else {
            (quote_b, quote_a)
        };

        // Relative to the buy side so the figure does not depend on chain order
        let pct = if buy.price > Decimal::ZERO {
            (sell.price - buy.price) / buy.price * dec!(100)
        } else {
            Decimal::ZERO
        };
        if pct <= self.config.min_price_diff_pct {
            return Err(SkipReason::BelowThreshold { pct, buy_chain: buy.chain_id });
        }

        let trade_size = self.config.trade_size;
        let gross = trade_size * (sell.price - buy.price);
        let cost = self
            .config
            .cost_model
            .estimate(buy.chain_id, sell.chain_id, trade_size, buy.price);
        let net_profit = gross - cost;
        if net_profit <= Decimal::ZERO {
            return Err(SkipReason::Unprofitable { net_profit, buy_chain: buy.chain_id });
        }

        Ok(ArbitrageOpportunity {
            id: uuid::Uuid::new_v4().to_string(),
            buy_chain: buy.chain_id,
            sell_chain: sell.chain_id,
            buy_price: buy.price,
            sell_price: sell.price,
            trade_size,
            price_difference_pct: pct,
            estimated_gross_profit: gross,
            estimated_cost: cost,
            net_profit,
            detected_at: now,
            valid_until: now + chrono_duration(self.config.max_opportunity_age),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthConfig;
    use crate::types::{ConnectionOutcome, PoolSnapshot};
    use proptest::prelude::*;
    use std::collections::HashMap;

    const A: ChainId = ChainId(8453);
    const B: ChainId = ChainId(10);

    fn quote(chain_id: ChainId, reserve_a: Decimal, reserve_b: Decimal, at: DateTime<Utc>) -> PriceQuote {
        let snapshot = PoolSnapshot {
            chain_id,
            reserve_a,
            reserve_b,
            fee_bps: 0,
            observed_at_block: 1,
            observed_at_time: at,
        };
        PriceQuote {
            chain_id,
            price: crate::oracle::spot_price(&snapshot).unwrap(),
            source_snapshot: snapshot,
            computed_at: at,
            stale: false,
        }
    }

    fn healthy(now: DateTime<Utc>) -> Arc<HealthTracker> {
        let health = Arc::new(HealthTracker::new(HealthConfig::default(), &[A, B]));
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        health.report_at(B, ConnectionOutcome::ReadSucceeded, now);
        health
    }

    fn config(threshold: Decimal) -> EvaluatorConfig {
        EvaluatorConfig {
            min_price_diff_pct: threshold,
            trade_size: dec!(10),
            cost_model: CostModel {
                gas_cost: HashMap::from([(A, dec!(0.05)), (B, dec!(0.05))]),
                fee_tier_bps: 0,
                slippage_margin_bps: 20,
            },
            ..EvaluatorConfig::default()
        }
    }

    #[test]
    fn test_five_percent_gap_buys_on_cheaper_chain() {
        let now = Utc::now();
        let evaluator = OpportunityEvaluator::new(config(dec!(2)), healthy(now));
        let a = quote(A, dec!(1000), dec!(2000), now);
        let b = quote(B, dec!(1000), dec!(2100), now);

        let opp = evaluator.evaluate_at(&a, &b, now).unwrap();
        assert_eq!(opp.price_difference_pct, dec!(5));
        assert_eq!(opp.buy_chain, A);
        assert_eq!(opp.sell_chain, B);
        assert_eq!(opp.estimated_gross_profit, dec!(1));
        // gas 0.10 + slippage 0.2% of 20
        assert_eq!(opp.estimated_cost, dec!(0.14));
        assert_eq!(opp.net_profit, dec!(0.86));
        assert_eq!(opp.valid_until - opp.detected_at, chrono::Duration::seconds(3));
    }

    #[test]
    fn test_gap_below_threshold_is_skipped() {
        let now = Utc::now();
        let evaluator = OpportunityEvaluator::new(config(dec!(8)), healthy(now));
        let a = quote(A, dec!(1000), dec!(2000), now);
        let b = quote(B, dec!(1000), dec!(2100), now);
        assert!(evaluator.evaluate_at(&a, &b, now).is_none());
    }

    #[test]
    fn test_old_quote_is_skipped() {
        let now = Utc::now();
        let evaluator = OpportunityEvaluator::new(config(dec!(2)), healthy(now));
        let a = quote(A, dec!(1000), dec!(2000), now - chrono::Duration::seconds(10));
        let b = quote(B, dec!(1000), dec!(2100), now);
        assert_eq!(
            evaluator.assess_at(&a, &b, now).unwrap_err(),
            SkipReason::Stale { chain_id: A }
        );
    }

    #[test]
    fn test_flagged_stale_quote_is_skipped() {
        let now = Utc::now();
        let evaluator = OpportunityEvaluator::new(config(dec!(2)), healthy(now));
        let a = quote(A, dec!(1000), dec!(2000), now);
        let mut b = quote(B, dec!(1000), dec!(2100), now);
        b.stale = true;
        assert!(evaluator.evaluate_at(&a, &b, now).is_none());
    }

    #[test]
    fn test_skewed_quotes_are_skipped() {
        let now = Utc::now();
        let evaluator = OpportunityEvaluator::new(
            EvaluatorConfig {
                max_quote_skew: Duration::from_millis(500),
                ..config(dec!(2))
            },
            healthy(now),
        );
        let a = quote(A, dec!(1000), dec!(2000), now - chrono::Duration::seconds(1));
        let b = quote(B, dec!(1000), dec!(2100), now);
        assert!(matches!(
            evaluator.assess_at(&a, &b, now),
            Err(SkipReason::Skewed { .. })
        ));
    }

    #[test]
    fn test_down_chain_is_skipped() {
        let now = Utc::now();
        let health = Arc::new(HealthTracker::new(HealthConfig::default(), &[A, B]));
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        let evaluator = OpportunityEvaluator::new(config(dec!(2)), health);
        let a = quote(A, dec!(1000), dec!(2000), now);
        let b = quote(B, dec!(1000), dec!(2100), now);
        assert_eq!(
            evaluator.assess_at(&a, &b, now).unwrap_err(),
            SkipReason::ChainDown { chain_id: B }
        );
    }

    #[test]
    fn test_costs_above_gross_are_skipped() {
        let now = Utc::now();
        let mut cfg = config(dec!(2));
        cfg.cost_model.gas_cost.insert(B, dec!(5));
        let evaluator = OpportunityEvaluator::new(cfg, healthy(now));
        let a = quote(A, dec!(1000), dec!(2000), now);
        let b = quote(B, dec!(1000), dec!(2100), now);
        assert!(matches!(
            evaluator.assess_at(&a, &b, now),
            Err(SkipReason::Unprofitable { buy_chain: A, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_gap_is_symmetric_and_profit_positive(
            ra in 100u64..1_000_000,
            rb in 100u64..1_000_000,
            sa in 100u64..1_000_000,
            sb in 100u64..1_000_000,
        ) {
            let now = Utc::now();
            let evaluator = OpportunityEvaluator::new(config(dec!(0.1)), healthy(now));
            let a = quote(A, Decimal::from(ra), Decimal::from(rb), now);
            let b = quote(B, Decimal::from(sa), Decimal::from(sb), now);

            let forward = evaluator.assess_at(&a, &b, now);
            let backward = evaluator.assess_at(&b, &a, now);
            match (forward, backward) {
                (Ok(f), Ok(r)) => {
                    prop_assert_eq!(f.price_difference_pct, r.price_difference_pct);
                    prop_assert_eq!(f.buy_chain, r.buy_chain);
                    prop_assert!(f.net_profit > Decimal::ZERO);
                    prop_assert!(f.buy_price <= f.sell_price);
                }
                (Err(f), Err(r)) => prop_assert_eq!(f.buy_chain(), r.buy_chain()),
                (f, r) => prop_assert!(false, "asymmetric verdicts: {:?} vs {:?}", f, r),
            }
        }
    }
}
