//! Startup pool validation

use alloy::providers::Provider;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{error, info};
use crate::{
    config::ChainConfig,
    errors::BotError,
    network::retry::{retry_with_backoff, RetryConfig},
    pools::{fetch_pool_info, get_pool_reserves},
    types::PoolInfo,
};

/// Checks that the configured pool exposes the configured tokens in the
/// configured order and holds liquidity.
pub fn check_pool_tokens(chain: &ChainConfig, pool_info: &PoolInfo) -> Result<()> {
    let (Some(base), Some(quote)) = (chain.base_token, chain.quote_token) else {
        return Ok(());
    };

    let expected = if chain.base_is_token0 { (base, quote) } else { (quote, base) };
    if (pool_info.token0, pool_info.token1) != expected {
        return Err(anyhow!(
            "pool tokens ({}, {}) do not match configured ({}, {})",
            pool_info.token0, pool_info.token1, expected.0, expected.1
        ));
    }
    Ok(())
}

pub async fn validate_pool_with_retry(
    provider: &Arc<dyn Provider>,
    chain: &ChainConfig,
) -> Result<PoolInfo> {
    let address = chain.pool()?;

    retry_with_backoff(
        move || async move {
            let network_error = |e: anyhow::Error| BotError::Network {
                message: format!("pool check on {} failed", chain.label()),
                source: Some(e),
                retry_count: 0,
            };

            let pool_info = fetch_pool_info(provider.as_ref(), chain, address)
                .await
                .map_err(network_error)?;
            let (r0, r1) = get_pool_reserves(provider.as_ref(), address, None)
                .await
                .map_err(network_error)?;
            Ok((pool_info, r0, r1))
        },
        &RetryConfig::default(),
        &format!("validate pool on {}", chain.label()),
    )
    .await
    .map_err(|e| anyhow!("Pool validation failed: {}", e))
    .and_then(|(pool_info, r0, r1)| {
        check_pool_tokens(chain, &pool_info)?;
        if r0.is_zero() || r1.is_zero() {
            return Err(anyhow!("Pool has zero liquidity"));
        }
        Ok(pool_info)
    })
}

pub async fn initialize_and_validate_pools(
    chains: &[(&ChainConfig, Arc<dyn Provider>)],
) -> Result<Vec<PoolInfo>> {
    info!("\n🔍 Validating pools on {} chains...", chains.len());
    let mut valid_pools = Vec::new();

    for (chain, provider) in chains {
        match validate_pool_with_retry(provider, chain).await {
            Ok(pool_info) => {
                info!("✅ {} - pool {} validated", chain.label(), pool_info.address);
                valid_pools.push(pool_info);
            }
            Err(e) => {
                error!("❌ {} - Validation failed: {}", chain.label(), e);
                // Arbitrage needs both sides; one bad pool is fatal
                return Err(e);
            }
        }
    }

    info!("✅ Validated {} pools", valid_pools.len());
    Ok(valid_pools)
}
