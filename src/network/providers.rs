//! Network provider setup

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::{anyhow, Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use crate::{
    config::ChainConfig,
    errors::BotError,
    network::retry::{retry_with_backoff, RetryConfig},
};

/// Provider for one chain plus the address trades settle to, if a key was given.
pub struct ChainProvider {
    pub provider: Arc<dyn Provider>,
    pub signer_address: Option<Address>,
}

pub async fn setup_chain_provider(
    chain: &ChainConfig,
    private_key: Option<&str>,
) -> Result<ChainProvider> {
    let rpc_url = chain.rpc_url()?;

    let (provider, signer_address): (Arc<dyn Provider>, Option<Address>) = match private_key {
        Some(pk) => {
            let signer = PrivateKeySigner::from_str(pk)
                .context("Failed to parse private key")?;
            let signer_address = signer.address();
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::from(signer))
                .on_builtin(&rpc_url)
                .await
                .with_context(|| format!("Failed to connect to {}", chain.label()))?;
            (Arc::new(provider), Some(signer_address))
        }
        None => {
            let provider = ProviderBuilder::new()
                .on_builtin(&rpc_url)
                .await
                .with_context(|| format!("Failed to connect to {}", chain.label()))?;
            (Arc::new(provider), None)
        }
    };

    info!("🔗 Testing connection to {}...", chain.label());
    let (remote_chain_id, block) = retry_with_backoff(
        || {
            let provider = provider.clone();
            async move {
                let network_error = |e: anyhow::Error| BotError::Network {
                    message: "connection check failed".to_string(),
                    source: Some(e),
                    retry_count: 0,
                };
                let remote_chain_id = provider.get_chain_id().await
                    .map_err(|e| network_error(e.into()))?;
                let block = provider.get_block_number().await
                    .map_err(|e| network_error(e.into()))?;
                Ok((remote_chain_id, block))
            }
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        &format!("{} connection", chain.label()),
    ).await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow!("Network connection failed: {}", e)
    })?;

    if remote_chain_id != chain.chain_id.0 {
        return Err(anyhow!(
            "RPC for {} reports chain id {}",
            chain.label(),
            remote_chain_id
        ));
    }

    info!("✅ Connected to {} at block {}", chain.label(), block);
    Ok(ChainProvider { provider, signer_address })
}
