//! Bot configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    arbitrage::{CostModel, EvaluatorConfig},
    engine::EngineConfig,
    errors::{BotError, BotResult},
    execution::ExecutionConfig,
    health::HealthConfig,
    network::RetryConfig,
    oracle::OracleConfig,
    types::ChainId,
};

// Configuration constants
pub const MIN_TRADE_SIZE: Decimal = dec!(0.001);
pub const MAX_TRADE_SIZE: Decimal = dec!(1000);
pub const MAX_SLIPPAGE_BPS: u32 = 500; // 5%
pub const MAX_FEE_BPS: u32 = 1_000; // 10%
pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_GAS_PRICE_GWEI: u32 = 50;
pub const MAX_GAS_PRICE_GWEI: u32 = 500;

/// One side of the arbitrage pair.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: Option<String>,
    pub pool_address: Option<Address>,
    pub router_address: Option<Address>,
    pub base_token: Option<Address>,
    pub quote_token: Option<Address>,
    /// Whether the pool's token0 is the base token.
    pub base_is_token0: bool,
    pub base_decimals: u32,
    pub quote_decimals: u32,
    pub fee_bps: u32,
    /// Estimated gas cost of one swap, in quote-token units.
    pub gas_cost: Decimal,
    pub gas_limit: u64,
    pub max_gas_price_gwei: u32,
}

impl ChainConfig {
    fn from_env(prefix: &str, default_id: u64, default_name: &str) -> Self {
        let var = |key: &str| env::var(format!("{prefix}_{key}")).ok();
        Self {
            chain_id: ChainId(var("ID").and_then(|s| s.parse().ok()).unwrap_or(default_id)),
            name: var("NAME").unwrap_or_else(|| default_name.to_string()),
            rpc_url: var("RPC_URL"),
            pool_address: var("POOL").and_then(|s| Address::from_str(&s).ok()),
            router_address: var("ROUTER").and_then(|s| Address::from_str(&s).ok()),
            base_token: var("BASE_TOKEN").and_then(|s| Address::from_str(&s).ok()),
            quote_token: var("QUOTE_TOKEN").and_then(|s| Address::from_str(&s).ok()),
            base_is_token0: var("BASE_IS_TOKEN0")
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            base_decimals: var("BASE_DECIMALS").and_then(|s| s.parse().ok()).unwrap_or(18),
            quote_decimals: var("QUOTE_DECIMALS").and_then(|s| s.parse().ok()).unwrap_or(6),
            fee_bps: var("FEE_BPS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30) // 0.3% constant-product default
                .min(MAX_FEE_BPS),
            gas_cost: var("GAS_COST")
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(0.05))
                .max(Decimal::ZERO),
            gas_limit: var("GAS_LIMIT").and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_GAS_LIMIT),
            max_gas_price_gwei: var("MAX_GAS_PRICE_GWEI")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GAS_PRICE_GWEI)
                .min(MAX_GAS_PRICE_GWEI),
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.chain_id)
    }

    fn require<T: Clone>(&self, value: &Option<T>, what: &str) -> BotResult<T> {
        value.clone().ok_or_else(|| BotError::Configuration {
            message: format!("{} is missing {}", self.label(), what),
        })
    }

    pub fn rpc_url(&self) -> BotResult<String> {
        self.require(&self.rpc_url, "an RPC URL")
    }

    pub fn pool(&self) -> BotResult<Address> {
        self.require(&self.pool_address, "a pool address")
    }

    pub fn router(&self) -> BotResult<Address> {
        self.require(&self.router_address, "a router address")
    }

    pub fn tokens(&self) -> BotResult<(Address, Address)> {
        Ok((
            self.require(&self.base_token, "a base token address")?,
            self.require(&self.quote_token, "a quote token address")?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chain_a: ChainConfig,
    pub chain_b: ChainConfig,
    pub private_key: Option<String>,
    /// Live submission when true, simulated fills otherwise.
    pub enable_trade_execution: bool,
    /// Initial value of the runtime enable flag.
    pub start_enabled: bool,
    pub simulated_failure_rate: f64,
    pub output_dir: PathBuf,
    // Pricing
    pub refresh_interval_ms: u64,
    pub read_timeout_ms: u64,
    pub freshness_bound_ms: u64,
    // Evaluation
    pub evaluation_interval_ms: u64,
    pub min_price_diff_pct: Decimal,
    pub trade_size: Decimal,
    pub max_quote_skew_ms: u64,
    pub max_opportunity_age_ms: u64,
    pub fee_tier_bps: u32,
    pub slippage_margin_bps: u32,
    // Execution
    pub confirmation_timeout_secs: u64,
    pub submit_max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub unwind_max_attempts: u32,
    pub trade_slippage_bps: u32,
    pub unwind_slippage_bps: u32,
    pub max_pool_impact_pct: Decimal,
    // Health
    pub degraded_after_failures: u32,
    pub down_after_failures: u32,
    pub degraded_after_silence_ms: u64,
    pub down_after_silence_ms: u64,
    // Circuit breaker
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(&s).ok())
}

impl Config {
    pub fn load() -> Self {
        Self {
            chain_a: ChainConfig::from_env("CHAIN_A", 8453, "base"),
            chain_b: ChainConfig::from_env("CHAIN_B", 10, "optimism"),
            private_key: env::var("PRIVATE_KEY").ok(),
            enable_trade_execution: env_parse("ENABLE_TRADE_EXECUTION").unwrap_or(false),
            start_enabled: env_parse("START_ENABLED").unwrap_or(true),
            simulated_failure_rate: env_parse::<f64>("SIMULATED_FAILURE_RATE")
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            refresh_interval_ms: env_parse("REFRESH_INTERVAL_MS")
                .unwrap_or(1_000)
                .max(MIN_REFRESH_INTERVAL_MS),
            read_timeout_ms: env_parse("READ_TIMEOUT_MS").unwrap_or(3_000),
            freshness_bound_ms: env_parse("FRESHNESS_BOUND_MS").unwrap_or(3_000),
            evaluation_interval_ms: env_parse("EVALUATION_INTERVAL_MS")
                .unwrap_or(1_000)
                .max(MIN_REFRESH_INTERVAL_MS),
            min_price_diff_pct: env_decimal("MIN_PRICE_DIFF_PCT")
                .unwrap_or(dec!(0.5))
                .max(Decimal::ZERO),
            trade_size: env_decimal("TRADE_SIZE")
                .unwrap_or(dec!(0.1))
                .max(MIN_TRADE_SIZE)
                .min(MAX_TRADE_SIZE),
            max_quote_skew_ms: env_parse("MAX_QUOTE_SKEW_MS").unwrap_or(2_000),
            max_opportunity_age_ms: env_parse("MAX_OPPORTUNITY_AGE_MS").unwrap_or(3_000),
            fee_tier_bps: env_parse("FEE_TIER_BPS").unwrap_or(0u32).min(MAX_FEE_BPS),
            slippage_margin_bps: env_parse("SLIPPAGE_MARGIN_BPS")
                .unwrap_or(20u32)
                .min(MAX_SLIPPAGE_BPS),
            confirmation_timeout_secs: env_parse("CONFIRMATION_TIMEOUT_SECS").unwrap_or(30),
            submit_max_retries: env_parse("SUBMIT_MAX_RETRIES").unwrap_or(2),
            retry_initial_delay_ms: env_parse("RETRY_INITIAL_DELAY_MS").unwrap_or(250),
            retry_max_delay_ms: env_parse("RETRY_MAX_DELAY_MS").unwrap_or(5_000),
            unwind_max_attempts: env_parse("UNWIND_MAX_ATTEMPTS").unwrap_or(3u32).max(1),
            trade_slippage_bps: env_parse("TRADE_SLIPPAGE_BPS")
                .unwrap_or(50u32)
                .min(MAX_SLIPPAGE_BPS),
            unwind_slippage_bps: env_parse("UNWIND_SLIPPAGE_BPS")
                .unwrap_or(150u32)
                .min(MAX_SLIPPAGE_BPS),
            max_pool_impact_pct: env_decimal("MAX_POOL_IMPACT_PCT").unwrap_or(dec!(1)),
            degraded_after_failures: env_parse("DEGRADED_AFTER_FAILURES").unwrap_or(2),
            down_after_failures: env_parse("DOWN_AFTER_FAILURES").unwrap_or(5),
            degraded_after_silence_ms: env_parse("DEGRADED_AFTER_SILENCE_MS").unwrap_or(5_000),
            down_after_silence_ms: env_parse("DOWN_AFTER_SILENCE_MS").unwrap_or(30_000),
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 60,
        }
    }

    /// Checks the settings `load` cannot default.
    pub fn validate(&self) -> BotResult<()> {
        if self.chain_a.chain_id == self.chain_b.chain_id {
            return Err(BotError::Configuration {
                message: format!("both sides are configured as {}", self.chain_a.chain_id),
            });
        }
        for chain in [&self.chain_a, &self.chain_b] {
            chain.rpc_url()?;
            chain.pool()?;
            if self.enable_trade_execution {
                chain.router()?;
                chain.tokens()?;
            }
        }
        if self.enable_trade_execution && self.private_key.is_none() {
            return Err(BotError::Configuration {
                message: "PRIVATE_KEY is required when ENABLE_TRADE_EXECUTION=true".to_string(),
            });
        }
        if self.down_after_failures < self.degraded_after_failures {
            return Err(BotError::Configuration {
                message: "DOWN_AFTER_FAILURES must not be below DEGRADED_AFTER_FAILURES".to_string(),
            });
        }
        Ok(())
    }

    pub fn chains(&self) -> [&ChainConfig; 2] {
        [&self.chain_a, &self.chain_b]
    }

    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            freshness_bound: Duration::from_millis(self.freshness_bound_ms),
        }
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        let gas_cost: HashMap<ChainId, Decimal> = self
            .chains()
            .iter()
            .map(|c| (c.chain_id, c.gas_cost))
            .collect();

        EvaluatorConfig {
            min_price_diff_pct: self.min_price_diff_pct,
            trade_size: self.trade_size,
            freshness_bound: Duration::from_millis(self.freshness_bound_ms),
            max_quote_skew: Duration::from_millis(self.max_quote_skew_ms),
            max_opportunity_age: Duration::from_millis(self.max_opportunity_age_ms),
            cost_model: CostModel {
                gas_cost,
                fee_tier_bps: self.fee_tier_bps,
                slippage_margin_bps: self.slippage_margin_bps,
            },
        }
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            submit_retry: RetryConfig {
                max_attempts: self.submit_max_retries + 1,
                initial_delay_ms: self.retry_initial_delay_ms,
                max_delay_ms: self.retry_max_delay_ms,
                exponential_base: 2.0,
            },
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            unwind_max_attempts: self.unwind_max_attempts,
            trade_slippage_bps: self.trade_slippage_bps,
            unwind_slippage_bps: self.unwind_slippage_bps,
            max_pool_impact_pct: self.max_pool_impact_pct,
            start_enabled: self.start_enabled,
            archive_dir: Some(self.output_dir.clone()),
            ..ExecutionConfig::default()
        }
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            degraded_after_failures: self.degraded_after_failures,
            down_after_failures: self.down_after_failures,
            degraded_after_silence: Duration::from_millis(self.degraded_after_silence_ms),
            down_after_silence: Duration::from_millis(self.down_after_silence_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chain_a: self.chain_a.chain_id,
            chain_b: self.chain_b.chain_id,
            oracle: self.oracle_config(),
            evaluator: self.evaluator_config(),
            execution: self.execution_config(),
            health: self.health_config(),
            evaluation_interval: Duration::from_millis(self.evaluation_interval_ms),
            max_consecutive_errors: self.max_consecutive_errors,
            circuit_breaker_cooldown: Duration::from_secs(self.circuit_breaker_cooldown_secs),
            output_dir: Some(self.output_dir.clone()),
        }
    }
}
