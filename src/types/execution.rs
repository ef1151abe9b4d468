//! Trade execution types

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use crate::errors::{BotError, BotResult};
use super::{ArbitrageOpportunity, ChainId, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeSide {
    /// Acquire `base_amount` of the base token, paying at most `limit_price` per unit.
    Buy,
    /// Dispose of `base_amount` of the base token, receiving at least `limit_price` per unit.
    Sell,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeParams {
    pub chain_id: ChainId,
    pub pool: Address,
    pub side: TradeSide,
    pub base_amount: Decimal,
    pub limit_price: Decimal,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionHandle {
    pub chain_id: ChainId,
    pub tx_hash: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConfirmationStatus {
    Confirmed { block: u64 },
    Reverted { reason: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LegStatus {
    NotStarted,
    Submitted { tx_hash: String },
    Confirmed { tx_hash: String, block: u64 },
    Reverted { tx_hash: String, reason: String },
    TimedOut { tx_hash: String },
    /// Submitted, but the confirmation query itself failed.
    Unconfirmed { tx_hash: String, reason: String },
    SubmitFailed { reason: String },
}

impl LegStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, LegStatus::Confirmed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttemptState {
    Idle,
    Validating,
    LegASubmitted,
    LegAConfirmed,
    LegBSubmitted,
    Completed,
    Rejected,
    LegAFailed,
    Failed,
    LegBFailed,
    Unwinding,
    Unwound,
    IncidentRaised,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptState::Completed
                | AttemptState::Rejected
                | AttemptState::Failed
                | AttemptState::Unwound
                | AttemptState::IncidentRaised
        )
    }

    /// States in which leg A has filled and leg B has not offset it yet.
    pub fn has_open_exposure(self) -> bool {
        matches!(
            self,
            AttemptState::LegAConfirmed
                | AttemptState::LegBSubmitted
                | AttemptState::LegBFailed
                | AttemptState::Unwinding
        )
    }

    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Rejected)
                | (Validating, LegASubmitted)
                | (Validating, LegAFailed)
                | (LegASubmitted, LegAConfirmed)
                | (LegASubmitted, LegAFailed)
                | (LegAFailed, Failed)
                | (LegAConfirmed, LegBSubmitted)
                | (LegAConfirmed, LegBFailed)
                | (LegBSubmitted, Completed)
                | (LegBSubmitted, LegBFailed)
                | (LegBFailed, Unwinding)
                | (Unwinding, Unwound)
                | (Unwinding, IncidentRaised)
        )
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub from: AttemptState,
    pub to: AttemptState,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionAttempt {
    pub id: String,
    pub opportunity: ArbitrageOpportunity,
    /// Opportunity as re-evaluated against fresh prices during `Validating`.
    pub validated_opportunity: Option<ArbitrageOpportunity>,
    pub validation: Option<ValidationResult>,
    pub state: AttemptState,
    pub leg_a_status: LegStatus,
    pub leg_b_status: LegStatus,
    pub unwind_status: LegStatus,
    pub unwind_attempts: u32,
    /// Transient submission retries spent across all legs.
    pub retry_count: u32,
    pub incident_flag: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub transitions: Vec<StateTransition>,
    pub failure_reason: Option<String>,
}

impl ExecutionAttempt {
    pub fn new(opportunity: ArbitrageOpportunity) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            opportunity,
            validated_opportunity: None,
            validation: None,
            state: AttemptState::Idle,
            leg_a_status: LegStatus::NotStarted,
            leg_b_status: LegStatus::NotStarted,
            unwind_status: LegStatus::NotStarted,
            unwind_attempts: 0,
            retry_count: 0,
            incident_flag: false,
            started_at: Utc::now(),
            finished_at: None,
            transitions: Vec::new(),
            failure_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition(&mut self, next: AttemptState) -> BotResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(BotError::InvalidTransition {
                attempt_id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }

        let now = Utc::now();
        self.transitions.push(StateTransition { from: self.state, to: next, at: now });
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(now);
        }
        if next == AttemptState::IncidentRaised {
            self.incident_flag = true;
        }
        Ok(())
    }

    /// Every state this attempt has passed through, starting with `Idle`.
    pub fn state_path(&self) -> Vec<AttemptState> {
        let mut path = vec![AttemptState::Idle];
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }
}

/// Exposure left on a chain after leg B and the unwind both failed.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentReport {
    pub attempt_id: String,
    pub chain_id: ChainId,
    pub base_amount: Decimal,
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// The attempt ended. Its state is terminal unless an illegal transition
    /// aborted it; the single-flight guard then latches an incident if a leg
    /// was left open.
    Finished(Box<ExecutionAttempt>),
    /// Another attempt holds the single-flight slot; skip this cycle.
    AlreadyInFlight,
    /// Execution is switched off.
    Disabled,
    /// An unresolved incident blocks automatic execution.
    Halted(IncidentReport),
}

impl ExecutionResult {
    pub fn attempt(&self) -> Option<&ExecutionAttempt> {
        match self {
            ExecutionResult::Finished(attempt) => Some(attempt),
            _ => None,
        }
    }

    pub fn final_state(&self) -> Option<AttemptState> {
        self.attempt().map(|a| a.state)
    }
}
