//! Custom error types for the bot

use alloy::primitives::Address;
use std::time::Duration;
use thiserror::Error;
use crate::types::{AttemptState, ChainId};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Read failed on {chain_id}: {message}")]
    ReadFailure {
        chain_id: ChainId,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Invalid pool state on {chain_id}: {reason}")]
    InvalidPoolState {
        chain_id: ChainId,
        reason: String,
    },

    #[error("Submission failed on {chain_id}: {message}")]
    SubmitFailure {
        chain_id: ChainId,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Transaction {tx_hash} reverted on {chain_id}: {reason}")]
    Reverted {
        chain_id: ChainId,
        tx_hash: String,
        reason: String,
    },

    #[error("{operation} on {chain_id} timed out after {after:?}")]
    TimedOut {
        chain_id: ChainId,
        operation: String,
        after: Duration,
    },

    #[error("Incident raised for attempt {attempt_id}: {reason}")]
    IncidentRaised {
        attempt_id: String,
        reason: String,
    },

    #[error("Attempt {attempt_id} cannot move from {from} to {to}")]
    InvalidTransition {
        attempt_id: String,
        from: AttemptState,
        to: AttemptState,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },

    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BotError {
    /// Errors worth retrying in place. Reverts, timeouts and incidents are
    /// outcomes, not glitches, and must never be retried as if transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BotError::ReadFailure { .. } | BotError::SubmitFailure { .. } | BotError::Network { .. }
        )
    }

    pub fn read_failure(chain_id: ChainId, message: impl Into<String>, source: anyhow::Error) -> Self {
        BotError::ReadFailure {
            chain_id,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn submit_failure(chain_id: ChainId, message: impl Into<String>, source: anyhow::Error) -> Self {
        BotError::SubmitFailure {
            chain_id,
            message: message.into(),
            source: Some(source),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let chain_id = ChainId(8453);
        assert!(BotError::read_failure(chain_id, "rpc down", anyhow::anyhow!("boom")).is_transient());
        assert!(BotError::submit_failure(chain_id, "nonce too low", anyhow::anyhow!("nonce")).is_transient());
        assert!(!BotError::Reverted {
            chain_id,
            tx_hash: "0xabc".to_string(),
            reason: "K".to_string(),
        }
        .is_transient());
        assert!(!BotError::TimedOut {
            chain_id,
            operation: "confirmation".to_string(),
            after: Duration::from_secs(30),
        }
        .is_transient());
    }

    #[test]
    fn test_display_includes_chain() {
        let err = BotError::InvalidPoolState {
            chain_id: ChainId(10),
            reason: "zero reserves".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid pool state on chain-10: zero reserves");
    }
}
