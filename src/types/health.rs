//! Health monitoring types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use super::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Down => "DOWN",
        };
        f.write_str(label)
    }
}

/// What happened on a single call through a chain connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    ReadSucceeded,
    ReadFailed,
    SubmitSucceeded,
    SubmitFailed,
}

impl ConnectionOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ConnectionOutcome::ReadSucceeded | ConnectionOutcome::SubmitSucceeded)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHealth {
    pub chain_id: ChainId,
    pub last_successful_read_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub status: HealthStatus,
}

/// Read-only aggregate handed to the status surface and the evaluator.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub chains: Vec<ConnectionHealth>,
    pub overall: HealthStatus,
    pub generated_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn chain(&self, chain_id: ChainId) -> Option<&ConnectionHealth> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}
