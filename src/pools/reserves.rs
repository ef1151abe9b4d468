//! Pool reserves fetching and snapshot construction

use alloy::{
    eips::BlockId,
    primitives::{Address, keccak256, U256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crate::{
    config::ChainConfig,
    errors::{BotError, BotResult},
    types::PoolSnapshot,
    utils::u256_to_decimal,
};

/// Raw `(reserve0, reserve1)` of a constant-product pool, optionally pinned to a block.
pub async fn get_pool_reserves(
    provider: &dyn Provider,
    pool: Address,
    block: Option<u64>,
) -> Result<(U256, U256)> {
    let data = keccak256("getReserves()")[..4].to_vec();
    let tx = TransactionRequest::default()
        .to(pool)
        .input(data.into());

    let call = provider.call(&tx);
    let result = match block {
        Some(number) => call.block(BlockId::number(number)).await,
        None => call.await,
    }
    .context("Failed to call getReserves")?;

    let decoded = <(U256, U256, U256)>::abi_decode(&result, true)
        .context("Failed to decode reserves")?;
    Ok((decoded.0, decoded.1))
}

/// Orders raw reserves into base/quote, scales them by token decimals and
/// rejects pools that cannot be priced.
pub fn snapshot_from_reserves(
    chain: &ChainConfig,
    reserve0: U256,
    reserve1: U256,
    block: u64,
    observed_at: DateTime<Utc>,
) -> BotResult<PoolSnapshot> {
    let (base_raw, quote_raw) = if chain.base_is_token0 {
        (reserve0, reserve1)
    } else {
        (reserve1, reserve0)
    };

    if base_raw.is_zero() || quote_raw.is_zero() {
        return Err(BotError::InvalidPoolState {
            chain_id: chain.chain_id,
            reason: "pool has zero reserves".to_string(),
        });
    }

    let overflow = |which: &str| BotError::InvalidPoolState {
        chain_id: chain.chain_id,
        reason: format!("{} reserve does not fit a decimal", which),
    };
    let reserve_a = u256_to_decimal(base_raw, chain.base_decimals).ok_or_else(|| overflow("base"))?;
    let reserve_b = u256_to_decimal(quote_raw, chain.quote_decimals).ok_or_else(|| overflow("quote"))?;

    Ok(PoolSnapshot {
        chain_id: chain.chain_id,
        reserve_a,
        reserve_b,
        fee_bps: chain.fee_bps,
        observed_at_block: block,
        observed_at_time: observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rust_decimal_macros::dec;

    fn chain(base_is_token0: bool) -> ChainConfig {
        let mut chain = Config::load().chain_a;
        chain.base_is_token0 = base_is_token0;
        chain.base_decimals = 18;
        chain.quote_decimals = 6;
        chain
    }

    #[test]
    fn test_orders_and_scales_reserves() {
        let weth = U256::from(2_000_000_000_000_000_000u128);
        let usdc = U256::from(7_000_000_000u64);

        let snapshot = snapshot_from_reserves(&chain(true), weth, usdc, 100, Utc::now()).unwrap();
        assert_eq!(snapshot.reserve_a, dec!(2));
        assert_eq!(snapshot.reserve_b, dec!(7000));
        assert_eq!(snapshot.observed_at_block, 100);

        let flipped = snapshot_from_reserves(&chain(false), usdc, weth, 100, Utc::now()).unwrap();
        assert_eq!(flipped.reserve_a, dec!(2));
        assert_eq!(flipped.reserve_b, dec!(7000));
    }

    #[test]
    fn test_zero_reserves_rejected() {
        let err = snapshot_from_reserves(&chain(true), U256::ZERO, U256::from(5u64), 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidPoolState { .. }));
    }
}
