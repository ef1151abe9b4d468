//! `ChainConnection` over an alloy provider

use alloy::{
    network::ReceiptResponse,
    primitives::{Address, TxHash},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::{
    config::ChainConfig,
    errors::{BotError, BotResult},
    execution::encode_swap_data,
    network::ChainConnection,
    pools::{get_pool_reserves, snapshot_from_reserves},
    types::{ChainId, ConfirmationStatus, PoolSnapshot, TradeParams, TransactionHandle},
};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct AlloyChainConnection {
    chain: ChainConfig,
    provider: Arc<dyn Provider>,
    /// Receives swap output; the signing wallet.
    recipient: Address,
}

impl AlloyChainConnection {
    pub fn new(chain: ChainConfig, provider: Arc<dyn Provider>, recipient: Address) -> Self {
        Self { chain, provider, recipient }
    }
}

#[async_trait]
impl ChainConnection for AlloyChainConnection {
    fn chain_id(&self) -> ChainId {
        self.chain.chain_id
    }

    async fn read_pool_reserves(&self, pool: Address) -> BotResult<PoolSnapshot> {
        let chain_id = self.chain.chain_id;
        let block = self.provider.get_block_number().await
            .map_err(|e| BotError::read_failure(chain_id, "block number", e.into()))?;

        // Pin the call to the block we just saw so block and reserves agree
        let (reserve0, reserve1) = get_pool_reserves(self.provider.as_ref(), pool, Some(block)).await
            .map_err(|e| BotError::read_failure(chain_id, format!("getReserves on {}", pool), e))?;

        snapshot_from_reserves(&self.chain, reserve0, reserve1, block, Utc::now())
    }

    async fn submit_trade(&self, params: &TradeParams) -> BotResult<TransactionHandle> {
        let chain_id = self.chain.chain_id;
        let router = self.chain.router()?;
        let swap_data = encode_swap_data(&self.chain, params, self.recipient)?;

        let tx = TransactionRequest::default()
            .to(router)
            .input(swap_data.into())
            .gas_limit(self.chain.gas_limit)
            .max_fee_per_gas(self.chain.max_gas_price_gwei as u128 * 1_000_000_000)
            .max_priority_fee_per_gas(1_000_000_000); // 1 gwei

        info!(
            chain = %chain_id,
            side = ?params.side,
            amount = %params.base_amount,
            limit = %params.limit_price,
            "📤 Sending swap to router {:?}", router
        );

        let pending_tx = self.provider.send_transaction(tx).await
            .map_err(|e| BotError::submit_failure(chain_id, "send_transaction", e.into()))?;

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        info!(chain = %chain_id, "📡 Transaction sent: {}", tx_hash);

        Ok(TransactionHandle {
            chain_id,
            tx_hash,
            submitted_at: Utc::now(),
        })
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
    ) -> BotResult<ConfirmationStatus> {
        let hash = TxHash::from_str(&handle.tx_hash).map_err(|e| BotError::Configuration {
            message: format!("malformed transaction hash {}: {}", handle.tx_hash, e),
        })?;

        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(hash).await {
                    Ok(Some(receipt)) => {
                        return if receipt.status() {
                            ConfirmationStatus::Confirmed {
                                block: receipt.block_number().unwrap_or_default(),
                            }
                        } else {
                            ConfirmationStatus::Reverted {
                                reason: "execution reverted".to_string(),
                            }
                        };
                    }
                    Ok(None) => debug!("{} not yet mined", handle.tx_hash),
                    Err(e) => warn!("Receipt poll for {} failed: {}", handle.tx_hash, e),
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };

        Ok(tokio::time::timeout(timeout, poll)
            .await
            .unwrap_or(ConfirmationStatus::TimedOut))
    }
}
