//! Pool token metadata

use alloy::{
    primitives::{keccak256, Address},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use anyhow::{Context, Result};
use tracing::debug;
use crate::{config::ChainConfig, types::PoolInfo};

/// Calls a zero-argument getter returning an address.
async fn read_address(provider: &dyn Provider, pool: Address, signature: &str) -> Result<Address> {
    let selector = keccak256(signature.as_bytes())[..4].to_vec();
    let request = TransactionRequest::default().to(pool).input(selector.into());
    let raw = provider
        .call(&request)
        .await
        .with_context(|| format!("{} call failed on {}", signature, pool))?;
    Address::abi_decode(&raw, true).with_context(|| format!("{} returned malformed data", signature))
}

pub async fn fetch_pool_info(provider: &dyn Provider, chain: &ChainConfig, address: Address) -> Result<PoolInfo> {
    debug!(chain = %chain.chain_id, "Reading token pair of pool {}", address);
    let (token0, token1) = tokio::try_join!(
        read_address(provider, address, "token0()"),
        read_address(provider, address, "token1()"),
    )?;

    Ok(PoolInfo {
        chain_id: chain.chain_id,
        address,
        name: format!("{} pool", chain.name),
        token0,
        token1,
    })
}
