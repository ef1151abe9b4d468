//! The per-chain capability the core trades through

use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use crate::{
    errors::{BotError, BotResult},
    types::{ChainId, ConfirmationStatus, PoolSnapshot, TradeParams, TransactionHandle},
};

/// Everything the bot needs from one chain.
///
/// Implementations must not retry internally; retry policy belongs to the
/// caller. `await_confirmation` must return within roughly `timeout`.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Fails with `BotError::ReadFailure` (or `InvalidPoolState`).
    async fn read_pool_reserves(&self, pool: Address) -> BotResult<PoolSnapshot>;

    /// Fails with `BotError::SubmitFailure` when the transaction never reached the chain.
    async fn submit_trade(&self, params: &TradeParams) -> BotResult<TransactionHandle>;

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
    ) -> BotResult<ConfirmationStatus>;
}

/// Connection and pool address for each chain the bot trades on.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<ChainId, ChainEndpoint>,
}

#[derive(Clone)]
pub struct ChainEndpoint {
    pub connection: Arc<dyn ChainConnection>,
    pub pool: Address,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: Arc<dyn ChainConnection>, pool: Address) {
        self.chains.insert(connection.chain_id(), ChainEndpoint { connection, pool });
    }

    pub fn with(mut self, connection: Arc<dyn ChainConnection>, pool: Address) -> Self {
        self.register(connection, pool);
        self
    }

    pub fn get(&self, chain_id: ChainId) -> BotResult<&ChainEndpoint> {
        self.chains.get(&chain_id).ok_or_else(|| BotError::Configuration {
            message: format!("no connection registered for {}", chain_id),
        })
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.chains.keys().copied().collect();
        ids.sort();
        ids
    }
}
