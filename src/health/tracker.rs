//! Per-chain connection health

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, warn};
use crate::types::{ChainId, ConnectionHealth, ConnectionOutcome, HealthReport, HealthStatus};

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub degraded_after_failures: u32,
    pub down_after_failures: u32,
    pub degraded_after_silence: Duration,
    pub down_after_silence: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degraded_after_failures: 2,
            down_after_failures: 5,
            degraded_after_silence: Duration::from_secs(5),
            down_after_silence: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ChainRecord {
    last_successful_read_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_status: Option<HealthStatus>,
}

/// Aggregates read and submit outcomes into a status per chain.
///
/// Status is derived on demand from the failure count and the age of the
/// last successful read, so silence alone is enough to degrade a chain.
pub struct HealthTracker {
    config: HealthConfig,
    chains: RwLock<HashMap<ChainId, ChainRecord>>,
}

impl HealthTracker {
    pub fn new(config: HealthConfig, chain_ids: &[ChainId]) -> Self {
        let chains = chain_ids
            .iter()
            .map(|id| (*id, ChainRecord::default()))
            .collect();
        Self {
            config,
            chains: RwLock::new(chains),
        }
    }

    pub fn report(&self, chain_id: ChainId, outcome: ConnectionOutcome) {
        self.report_at(chain_id, outcome, Utc::now());
    }

    pub fn report_at(&self, chain_id: ChainId, outcome: ConnectionOutcome, now: DateTime<Utc>) {
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        let record = chains.entry(chain_id).or_default();

        if outcome == ConnectionOutcome::ReadSucceeded {
            record.last_successful_read_at = Some(now);
        }
        if outcome.is_success() {
            record.consecutive_failures /= 2;
        } else {
            record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        }

        let status = self.derive_status(record, now);
        if record.last_status != Some(status) {
            match status {
                HealthStatus::Healthy => info!(chain = %chain_id, "💚 Connection {}", status),
                _ => warn!(
                    chain = %chain_id,
                    failures = record.consecutive_failures,
                    "🩺 Connection {}", status
                ),
            }
            record.last_status = Some(status);
        }
    }

    pub fn status(&self) -> HealthReport {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> HealthReport {
        let chains = self.chains.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<ConnectionHealth> = chains
            .iter()
            .map(|(id, record)| ConnectionHealth {
                chain_id: *id,
                last_successful_read_at: record.last_successful_read_at,
                consecutive_failures: record.consecutive_failures,
                status: self.derive_status(record, now),
            })
            .collect();
        entries.sort_by_key(|c| c.chain_id);

        let overall = entries
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Down);

        HealthReport {
            chains: entries,
            overall,
            generated_at: now,
        }
    }

    pub fn chain_status(&self, chain_id: ChainId) -> HealthStatus {
        self.chain_status_at(chain_id, Utc::now())
    }

    /// Unknown chains count as `Down`.
    pub fn chain_status_at(&self, chain_id: ChainId, now: DateTime<Utc>) -> HealthStatus {
        let chains = self.chains.read().unwrap_or_else(|e| e.into_inner());
        chains
            .get(&chain_id)
            .map(|record| self.derive_status(record, now))
            .unwrap_or(HealthStatus::Down)
    }

    pub fn is_down_at(&self, chain_id: ChainId, now: DateTime<Utc>) -> bool {
        self.chain_status_at(chain_id, now) == HealthStatus::Down
    }

    fn derive_status(&self, record: &ChainRecord, now: DateTime<Utc>) -> HealthStatus {
        let Some(last_read) = record.last_successful_read_at else {
            return HealthStatus::Down;
        };
        let silence = now
            .signed_duration_since(last_read)
            .to_std()
            .unwrap_or_default();

        if record.consecutive_failures >= self.config.down_after_failures
            || silence > self.config.down_after_silence
        {
            HealthStatus::Down
        } else if record.consecutive_failures >= self.config.degraded_after_failures
            || silence > self.config.degraded_after_silence
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChainId = ChainId(8453);
    const B: ChainId = ChainId(10);

    fn tracker() -> HealthTracker {
        HealthTracker::new(HealthConfig::default(), &[A, B])
    }

    #[test]
    fn test_down_until_first_read() {
        let health = tracker();
        let now = Utc::now();
        assert_eq!(health.chain_status_at(A, now), HealthStatus::Down);

        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        assert_eq!(health.chain_status_at(A, now), HealthStatus::Healthy);
        assert_eq!(health.status_at(now).overall, HealthStatus::Down);
    }

    #[test]
    fn test_failures_degrade_then_down() {
        let health = tracker();
        let now = Utc::now();
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);

        health.report_at(A, ConnectionOutcome::ReadFailed, now);
        assert_eq!(health.chain_status_at(A, now), HealthStatus::Healthy);
        health.report_at(A, ConnectionOutcome::ReadFailed, now);
        assert_eq!(health.chain_status_at(A, now), HealthStatus::Degraded);
        for _ in 0..3 {
            health.report_at(A, ConnectionOutcome::SubmitFailed, now);
        }
        assert!(health.is_down_at(A, now));
    }

    #[test]
    fn test_success_halves_failure_count() {
        let health = tracker();
        let now = Utc::now();
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        for _ in 0..4 {
            health.report_at(A, ConnectionOutcome::ReadFailed, now);
        }
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        assert_eq!(health.status_at(now).chain(A).unwrap().consecutive_failures, 2);
        health.report_at(A, ConnectionOutcome::SubmitSucceeded, now);
        assert_eq!(health.status_at(now).chain(A).unwrap().consecutive_failures, 1);
    }

    #[test]
    fn test_silence_degrades_then_down() {
        let health = tracker();
        let start = Utc::now();
        health.report_at(B, ConnectionOutcome::ReadSucceeded, start);

        let later = |secs| start + chrono::Duration::seconds(secs);
        assert_eq!(health.chain_status_at(B, later(3)), HealthStatus::Healthy);
        assert_eq!(health.chain_status_at(B, later(10)), HealthStatus::Degraded);
        assert_eq!(health.chain_status_at(B, later(31)), HealthStatus::Down);
    }

    #[test]
    fn test_submit_success_does_not_count_as_read() {
        let health = tracker();
        let now = Utc::now();
        health.report_at(A, ConnectionOutcome::SubmitSucceeded, now);
        assert!(health.is_down_at(A, now));
    }

    #[test]
    fn test_overall_is_worst_chain() {
        let health = tracker();
        let now = Utc::now();
        health.report_at(A, ConnectionOutcome::ReadSucceeded, now);
        health.report_at(B, ConnectionOutcome::ReadSucceeded, now);
        assert_eq!(health.status_at(now).overall, HealthStatus::Healthy);

        health.report_at(B, ConnectionOutcome::ReadFailed, now);
        health.report_at(B, ConnectionOutcome::ReadFailed, now);
        let report = health.status_at(now);
        assert_eq!(report.overall, HealthStatus::Degraded);
        assert_eq!(report.chains.len(), 2);
    }
}
