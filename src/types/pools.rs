//! Pool-related types and structures

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::ChainId;

/// Reserves of one pool as observed at a single block.
///
/// `reserve_a` is the base token and `reserve_b` the quote token, both already
/// scaled down by their token decimals. Snapshots are never mutated; every
/// read produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub chain_id: ChainId,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub fee_bps: u32,
    pub observed_at_block: u64,
    pub observed_at_time: DateTime<Utc>,
}

/// Static description of a configured pool, checked once at startup.
#[derive(Debug, Clone)]
pub struct PoolInfo {
    pub chain_id: ChainId,
    pub address: Address,
    pub name: String,
    pub token0: Address,
    pub token1: Address,
}
