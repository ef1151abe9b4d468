//! Read-only status types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::types::{
    AttemptState, ExecutionAttempt, ExecutionResult, HealthReport, IncidentReport, PriceQuote,
};

#[derive(Debug, Clone, Serialize)]
pub struct LatestPrices {
    pub chain_a: Option<PriceQuote>,
    pub chain_b: Option<PriceQuote>,
}

/// Counters for the current process lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub skipped_cycles: u64,
    pub opportunities: u64,
    pub potential_profit: Decimal,
    pub attempts: u64,
    pub completed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub unwound: u64,
    pub incidents: u64,
    pub already_in_flight: u64,
    /// Sum of `net_profit` over completed attempts.
    pub expected_profit_captured: Decimal,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            cycles: 0,
            skipped_cycles: 0,
            opportunities: 0,
            potential_profit: Decimal::ZERO,
            attempts: 0,
            completed: 0,
            rejected: 0,
            failed: 0,
            unwound: 0,
            incidents: 0,
            already_in_flight: 0,
            expected_profit_captured: Decimal::ZERO,
        }
    }

    pub fn record_result(&mut self, result: &ExecutionResult) {
        match result {
            ExecutionResult::Finished(attempt) => {
                self.attempts += 1;
                match attempt.state {
                    AttemptState::Completed => {
                        self.completed += 1;
                        let plan = attempt.validated_opportunity.as_ref().unwrap_or(&attempt.opportunity);
                        self.expected_profit_captured += plan.net_profit;
                    }
                    AttemptState::Rejected => self.rejected += 1,
                    AttemptState::Failed => self.failed += 1,
                    AttemptState::Unwound => self.unwound += 1,
                    AttemptState::IncidentRaised => self.incidents += 1,
                    _ => {}
                }
            }
            ExecutionResult::AlreadyInFlight => self.already_in_flight += 1,
            ExecutionResult::Disabled | ExecutionResult::Halted(_) => {}
        }
    }

    pub fn success_rate_pct(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.completed as f64 / self.attempts as f64 * 100.0
        }
    }
}

/// Everything an external dashboard needs, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub generated_at: DateTime<Utc>,
    pub enabled: bool,
    pub in_flight: bool,
    pub latest_prices: LatestPrices,
    pub health: HealthReport,
    pub current_attempt: Option<ExecutionAttempt>,
    pub incident: Option<IncidentReport>,
    pub circuit_breaker_open: bool,
    pub stats: SessionStats,
}
