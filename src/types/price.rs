//! Price quote types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::{ChainId, PoolSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub chain_id: ChainId,
    /// Quote-token per base-token, fee adjusted.
    pub price: Decimal,
    pub source_snapshot: PoolSnapshot,
    pub computed_at: DateTime<Utc>,
    pub stale: bool,
}

impl PriceQuote {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.computed_at)
    }

    /// True when the quote was flagged stale or has aged past `freshness_bound`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, freshness_bound: Duration) -> bool {
        self.stale || self.age(now) > freshness_bound
    }

    /// Copy of this quote with `stale` re-derived for `now`.
    pub fn observed_at(&self, now: DateTime<Utc>, freshness_bound: Duration) -> Self {
        Self {
            stale: self.is_stale_at(now, freshness_bound),
            ..self.clone()
        }
    }
}
