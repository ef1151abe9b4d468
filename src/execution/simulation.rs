//! Dry-run chain connection: live reads, simulated fills

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use crate::{
    errors::BotResult,
    network::ChainConnection,
    types::{ChainId, ConfirmationStatus, PoolSnapshot, TradeParams, TransactionHandle},
};

pub struct SimulatedChainConnection {
    reads: Arc<dyn ChainConnection>,
    latency: Duration,
    /// Probability in [0, 1] that a simulated transaction reverts.
    failure_rate: f64,
}

impl SimulatedChainConnection {
    pub fn new(reads: Arc<dyn ChainConnection>, latency: Duration, failure_rate: f64) -> Self {
        Self {
            reads,
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl ChainConnection for SimulatedChainConnection {
    fn chain_id(&self) -> ChainId {
        self.reads.chain_id()
    }

    async fn read_pool_reserves(&self, pool: Address) -> BotResult<PoolSnapshot> {
        self.reads.read_pool_reserves(pool).await
    }

    async fn submit_trade(&self, params: &TradeParams) -> BotResult<TransactionHandle> {
        let tx_hash = format!("0x{}", uuid::Uuid::new_v4().simple());
        info!(
            chain = %params.chain_id,
            side = ?params.side,
            amount = %params.base_amount,
            "🎭 Simulated submission {}", tx_hash
        );
        Ok(TransactionHandle {
            chain_id: self.chain_id(),
            tx_hash,
            submitted_at: Utc::now(),
        })
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
    ) -> BotResult<ConfirmationStatus> {
        if self.latency > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(ConfirmationStatus::TimedOut);
        }
        tokio::time::sleep(self.latency).await;

        let reverted = rand::random::<f64>() < self.failure_rate;
        info!("🎭 Simulated confirmation for {}: reverted={}", handle.tx_hash, reverted);

        Ok(if reverted {
            ConfirmationStatus::Reverted {
                reason: "simulated revert".to_string(),
            }
        } else {
            ConfirmationStatus::Confirmed { block: 0 }
        })
    }
}
