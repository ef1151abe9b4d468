//! Scripted chain connection and engine fixtures shared by the scenario tests

#![allow(dead_code)]

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xchain_arb_bot::{
    arbitrage::{CostModel, EvaluatorConfig},
    execution::ExecutionConfig,
    network::RetryConfig,
    ArbitrageEngine, BotError, BotResult, ChainConnection, ChainId, ChainRegistry,
    ConfirmationStatus, EngineConfig, PoolSnapshot, TradeParams, TradeSide, TransactionHandle,
};

pub const CHAIN_A: ChainId = ChainId(8453);
pub const CHAIN_B: ChainId = ChainId(10);

/// How the next confirmation resolves.
#[derive(Debug, Clone)]
pub enum Confirm {
    Confirmed,
    Reverted,
    TimedOut,
    /// Resolves as confirmed after the delay.
    After(Duration),
    /// Never resolves.
    Hang,
    /// The confirmation query fails outright.
    Error,
}

/// Chain double: serves reads from settable reserves and replays scripted
/// submission and confirmation outcomes. Unscripted calls succeed.
pub struct MockConnection {
    chain_id: ChainId,
    reserves: Mutex<(Decimal, Decimal)>,
    failing_reads: Mutex<u32>,
    block: AtomicU64,
    submits: Mutex<VecDeque<bool>>,
    confirmations: Mutex<VecDeque<Confirm>>,
    submitted: Mutex<Vec<TradeParams>>,
}

impl MockConnection {
    pub fn new(chain_id: ChainId, reserve_a: Decimal, reserve_b: Decimal) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            reserves: Mutex::new((reserve_a, reserve_b)),
            failing_reads: Mutex::new(0),
            block: AtomicU64::new(100),
            submits: Mutex::new(VecDeque::new()),
            confirmations: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reserves(&self, reserve_a: Decimal, reserve_b: Decimal) {
        *self.reserves.lock().unwrap() = (reserve_a, reserve_b);
    }

    pub fn fail_reads(&self, count: u32) {
        *self.failing_reads.lock().unwrap() = count;
    }

    /// `false` entries fail with a transient `SubmitFailure`.
    pub fn script_submits(&self, outcomes: &[bool]) {
        self.submits.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn script_confirmations(&self, outcomes: &[Confirm]) {
        self.confirmations.lock().unwrap().extend(outcomes.iter().cloned());
    }

    pub fn submitted(&self) -> Vec<TradeParams> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_sides(&self) -> Vec<TradeSide> {
        self.submitted().iter().map(|p| p.side).collect()
    }
}

#[async_trait]
impl ChainConnection for MockConnection {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn read_pool_reserves(&self, _pool: Address) -> BotResult<PoolSnapshot> {
        {
            let mut failing = self.failing_reads.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(BotError::ReadFailure {
                    chain_id: self.chain_id,
                    message: "scripted read failure".to_string(),
                    source: None,
                });
            }
        }

        let (reserve_a, reserve_b) = *self.reserves.lock().unwrap();
        Ok(PoolSnapshot {
            chain_id: self.chain_id,
            reserve_a,
            reserve_b,
            fee_bps: 0,
            observed_at_block: self.block.fetch_add(1, Ordering::SeqCst),
            observed_at_time: Utc::now(),
        })
    }

    async fn submit_trade(&self, params: &TradeParams) -> BotResult<TransactionHandle> {
        let succeed = self.submits.lock().unwrap().pop_front().unwrap_or(true);
        if !succeed {
            return Err(BotError::SubmitFailure {
                chain_id: self.chain_id,
                message: "scripted submission failure".to_string(),
                source: None,
            });
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(params.clone());
        Ok(TransactionHandle {
            chain_id: self.chain_id,
            tx_hash: format!("0x{}{:02}", self.chain_id.0, submitted.len()),
            submitted_at: Utc::now(),
        })
    }

    async fn await_confirmation(
        &self,
        _handle: &TransactionHandle,
        timeout: Duration,
    ) -> BotResult<ConfirmationStatus> {
        let next = self
            .confirmations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Confirm::Confirmed);

        match next {
            Confirm::Confirmed => Ok(ConfirmationStatus::Confirmed { block: 1 }),
            Confirm::Reverted => Ok(ConfirmationStatus::Reverted {
                reason: "scripted revert".to_string(),
            }),
            Confirm::TimedOut => Ok(ConfirmationStatus::TimedOut),
            Confirm::After(delay) if delay > timeout => {
                tokio::time::sleep(timeout).await;
                Ok(ConfirmationStatus::TimedOut)
            }
            Confirm::After(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ConfirmationStatus::Confirmed { block: 1 })
            }
            Confirm::Hang => std::future::pending().await,
            Confirm::Error => Err(BotError::Network {
                message: "scripted receipt query failure".to_string(),
                source: None,
                retry_count: 0,
            }),
        }
    }
}

/// Chain A at 2.0, chain B at 2.1: a 5% gap, buy on A.
pub fn mock_pair() -> (Arc<MockConnection>, Arc<MockConnection>) {
    (
        MockConnection::new(CHAIN_A, dec!(1000), dec!(2000)),
        MockConnection::new(CHAIN_B, dec!(1000), dec!(2100)),
    )
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        evaluator: EvaluatorConfig {
            min_price_diff_pct: dec!(2),
            trade_size: dec!(1),
            cost_model: CostModel {
                gas_cost: HashMap::from([(CHAIN_A, dec!(0.01)), (CHAIN_B, dec!(0.01))]),
                fee_tier_bps: 0,
                slippage_margin_bps: 20,
            },
            ..EvaluatorConfig::default()
        },
        execution: ExecutionConfig {
            submit_retry: RetryConfig::with_retries(2),
            confirmation_timeout: Duration::from_secs(30),
            unwind_max_attempts: 3,
            ..ExecutionConfig::default()
        },
        max_consecutive_errors: 3,
        ..EngineConfig::new(CHAIN_A, CHAIN_B)
    }
}

pub fn engine(a: &Arc<MockConnection>, b: &Arc<MockConnection>) -> ArbitrageEngine {
    engine_with(a, b, engine_config())
}

pub fn engine_with(a: &Arc<MockConnection>, b: &Arc<MockConnection>, config: EngineConfig) -> ArbitrageEngine {
    let registry = ChainRegistry::new()
        .with(a.clone(), Address::ZERO)
        .with(b.clone(), Address::ZERO);
    ArbitrageEngine::new(config, registry).expect("both chains registered")
}

/// Publishes a fresh quote for both chains.
pub async fn prime_prices(engine: &ArbitrageEngine) {
    engine.oracle().refresh(CHAIN_A).await.expect("chain A read");
    engine.oracle().refresh(CHAIN_B).await.expect("chain B read");
}
