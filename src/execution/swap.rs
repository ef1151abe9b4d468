//! Router calldata for trade legs

use alloy::primitives::{Address, keccak256, U256};
use tracing::debug;
use crate::{
    config::ChainConfig,
    errors::{BotError, BotResult},
    types::{TradeParams, TradeSide},
    utils::decimal_to_u256,
};

const SWAP_EXACT_IN: &str = "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)";
const SWAP_EXACT_OUT: &str = "swapTokensForExactTokens(uint256,uint256,address[],address,uint256)";

/// Uniswap-V2-style router call for one leg.
///
/// Buys are exact-out (receive `base_amount`, pay at most `base_amount * limit_price`);
/// sells are exact-in (pay `base_amount`, receive at least `base_amount * limit_price`).
pub fn encode_swap_data(
    chain: &ChainConfig,
    params: &TradeParams,
    recipient: Address,
) -> BotResult<Vec<u8>> {
    let (base_token, quote_token) = chain.tokens()?;
    let invalid = |what: &str| BotError::Configuration {
        message: format!("{} for {:?} on {} is out of range", what, params.side, chain.label()),
    };

    let base_amount = decimal_to_u256(params.base_amount, chain.base_decimals)
        .ok_or_else(|| invalid("base amount"))?;
    let quote_amount = decimal_to_u256(params.base_amount * params.limit_price, chain.quote_decimals)
        .ok_or_else(|| invalid("quote amount"))?;

    let (signature, first, second, path) = match params.side {
        TradeSide::Buy => (SWAP_EXACT_OUT, base_amount, quote_amount, [quote_token, base_token]),
        TradeSide::Sell => (SWAP_EXACT_IN, base_amount, quote_amount, [base_token, quote_token]),
    };
    let deadline = U256::from(params.deadline.timestamp().max(0) as u64);

    let mut encoded = keccak256(signature)[..4].to_vec();

    encoded.extend_from_slice(&first.to_be_bytes::<32>());
    encoded.extend_from_slice(&second.to_be_bytes::<32>());
    // Offset of the dynamic `path` array: five head words
    encoded.extend_from_slice(&U256::from(160).to_be_bytes::<32>());
    encoded.extend_from_slice(&[0u8; 12]);
    encoded.extend_from_slice(recipient.as_slice());
    encoded.extend_from_slice(&deadline.to_be_bytes::<32>());
    encoded.extend_from_slice(&U256::from(path.len()).to_be_bytes::<32>());

    for addr in path {
        encoded.extend_from_slice(&[0u8; 12]);
        encoded.extend_from_slice(addr.as_slice());
    }

    debug!("📝 Encoded {:?} swap for {}", params.side, chain.label());
    Ok(encoded)
}
