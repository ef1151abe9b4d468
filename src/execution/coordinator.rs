//! Two-leg execution with single-flight, bounded retries and unwind

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info, warn};
use crate::{
    arbitrage::OpportunityEvaluator,
    errors::{BotError, BotResult},
    health::HealthTracker,
    network::{retry_with_backoff, ChainConnection, ChainRegistry, RetryConfig},
    oracle::PriceOracle,
    storage::save_execution_attempt,
    types::{
        ArbitrageOpportunity, AttemptState, ChainId, ConfirmationStatus, ConnectionOutcome,
        ExecutionAttempt, ExecutionResult, IncidentReport, LegStatus, TradeParams, TradeSide,
        TransactionHandle, ValidationResult,
    },
    utils::{bps_to_fraction, chrono_duration},
    validation::{revalidate_opportunity, MarketCheck},
};

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Applies to each submission separately; only transient failures are retried.
    pub submit_retry: RetryConfig,
    pub submit_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub unwind_max_attempts: u32,
    pub trade_slippage_bps: u32,
    pub unwind_slippage_bps: u32,
    pub max_pool_impact_pct: Decimal,
    pub trade_deadline: Duration,
    pub history_limit: usize,
    pub start_enabled: bool,
    /// Terminal attempts are appended here as JSON lines when set.
    pub archive_dir: Option<PathBuf>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            submit_retry: RetryConfig::with_retries(2),
            submit_timeout: Duration::from_secs(15),
            confirmation_timeout: Duration::from_secs(30),
            unwind_max_attempts: 3,
            trade_slippage_bps: 50,
            unwind_slippage_bps: 150,
            max_pool_impact_pct: dec!(1),
            trade_deadline: Duration::from_secs(120),
            history_limit: 100,
            start_enabled: true,
            archive_dir: None,
        }
    }
}

/// How a submitted leg ended.
enum LegOutcome {
    Confirmed(LegStatus),
    Failed(LegStatus, String),
}

pub struct ExecutionCoordinator {
    config: ExecutionConfig,
    registry: ChainRegistry,
    oracle: Arc<PriceOracle>,
    evaluator: Arc<OpportunityEvaluator>,
    health: Arc<HealthTracker>,
    enabled: AtomicBool,
    in_flight: AtomicBool,
    current: Mutex<Option<ExecutionAttempt>>,
    incident: Mutex<Option<IncidentReport>>,
    history: Mutex<VecDeque<ExecutionAttempt>>,
}

/// Holds the single-flight slot for one attempt and releases it on drop.
///
/// An attempt still published in `current` at drop time was cancelled
/// mid-flight; if a leg may have filled, an incident is latched.
struct FlightGuard<'a> {
    coordinator: &'a ExecutionCoordinator,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let coordinator = self.coordinator;
        let abandoned = lock(&coordinator.current).take();
        if let Some(mut attempt) = abandoned {
            let exposed = attempt.state.has_open_exposure() || attempt.state == AttemptState::LegASubmitted;
            if exposed {
                let reason = format!("attempt abandoned in {} with possible one-sided exposure", attempt.state);
                error!(attempt_id = %attempt.id, "🚨 {}", reason);
                attempt.incident_flag = true;
                attempt.failure_reason = Some(reason.clone());
                coordinator.latch_incident(IncidentReport {
                    attempt_id: attempt.id.clone(),
                    chain_id: attempt.opportunity.buy_chain,
                    base_amount: attempt.opportunity.trade_size,
                    reason,
                    raised_at: Utc::now(),
                });
            } else {
                warn!(attempt_id = %attempt.id, state = %attempt.state, "Attempt abandoned before committing capital");
            }
            attempt.finished_at = Some(Utc::now());
            coordinator.archive(attempt);
        }
        coordinator.in_flight.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ExecutionCoordinator {
    pub fn new(
        config: ExecutionConfig,
        registry: ChainRegistry,
        oracle: Arc<PriceOracle>,
        evaluator: Arc<OpportunityEvaluator>,
        health: Arc<HealthTracker>,
    ) -> Self {
        let enabled = AtomicBool::new(config.start_enabled);
        Self {
            config,
            registry,
            oracle,
            evaluator,
            health,
            enabled,
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
            incident: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Only gates new attempts; a running attempt always finishes.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!("⚙️  Execution {}", if enabled { "ENABLED" } else { "DISABLED" });
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn current_attempt_state(&self) -> Option<ExecutionAttempt> {
        lock(&self.current).clone()
    }

    pub fn incident(&self) -> Option<IncidentReport> {
        lock(&self.incident).clone()
    }

    /// Acknowledges the latched incident and re-allows automatic attempts.
    pub fn clear_incident(&self) -> Option<IncidentReport> {
        let cleared = lock(&self.incident).take();
        if let Some(report) = &cleared {
            info!(attempt_id = %report.attempt_id, "Incident cleared, automatic execution resumes");
        }
        cleared
    }

    /// Archived attempts, oldest first.
    pub fn recent_attempts(&self) -> Vec<ExecutionAttempt> {
        lock(&self.history).iter().cloned().collect()
    }

    pub async fn attempt(&self, opportunity: ArbitrageOpportunity) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ExecutionResult::AlreadyInFlight;
        }
        let _guard = FlightGuard { coordinator: self };

        // Checked under the slot: the previous holder latches before releasing it
        if let Some(report) = self.incident() {
            warn!(attempt_id = %report.attempt_id, "Execution halted by unresolved incident");
            return ExecutionResult::Halted(report);
        }

        let mut attempt = ExecutionAttempt::new(opportunity);
        info!(
            attempt_id = %attempt.id,
            opportunity_id = %attempt.opportunity.id,
            "🚀 Starting attempt: {}", attempt.opportunity.direction()
        );
        self.publish(&attempt);

        if let Err(e) = self.run(&mut attempt).await {
            // Only a state-machine guard error lands here
            error!(attempt_id = %attempt.id, "Attempt aborted in {}: {}", attempt.state, e);
            attempt.failure_reason = Some(e.to_string());
            // Left published so the guard decides between incident and release
            self.publish(&attempt);
            return ExecutionResult::Finished(Box::new(attempt));
        }

        lock(&self.current).take();
        self.archive(attempt.clone());
        ExecutionResult::Finished(Box::new(attempt))
    }

    async fn run(&self, attempt: &mut ExecutionAttempt) -> BotResult<()> {
        self.step(attempt, AttemptState::Validating)?;
        let (validation, fresh) = self.validate(&attempt.opportunity).await;
        let passed = validation.all_passed;
        attempt.validated_opportunity = fresh;
        if !passed {
            attempt.failure_reason = Some(validation.summary());
            info!(attempt_id = %attempt.id, "❌ Rejected: {}", validation.summary());
        }
        attempt.validation = Some(validation);
        if !passed {
            return self.step(attempt, AttemptState::Rejected);
        }

        let plan = attempt
            .validated_opportunity
            .clone()
            .unwrap_or_else(|| attempt.opportunity.clone());
        let trade_slippage = bps_to_fraction(self.config.trade_slippage_bps);

        // Leg A: buy on the cheaper chain
        let submitted = match self.trade_params(
            plan.buy_chain,
            TradeSide::Buy,
            plan.trade_size,
            plan.buy_price * (Decimal::ONE + trade_slippage),
        ) {
            Ok(buy) => self.submit_with_retry(&buy, &mut attempt.retry_count).await,
            Err(e) => Err(e),
        };
        let handle = match submitted {
            Ok(handle) => handle,
            Err(e) => {
                attempt.leg_a_status = LegStatus::SubmitFailed { reason: e.to_string() };
                return self.fail_leg_a(attempt, e.to_string());
            }
        };
        attempt.leg_a_status = LegStatus::Submitted { tx_hash: handle.tx_hash.clone() };
        self.step(attempt, AttemptState::LegASubmitted)?;

        match self.confirm(&handle).await {
            LegOutcome::Confirmed(status) => {
                attempt.leg_a_status = status;
                self.step(attempt, AttemptState::LegAConfirmed)?;
            }
            LegOutcome::Failed(status, reason) => {
                attempt.leg_a_status = status;
                return self.fail_leg_a(attempt, reason);
            }
        }

        // Leg B: sell on the pricier chain. From here on every failure unwinds.
        let submitted = match self.trade_params(
            plan.sell_chain,
            TradeSide::Sell,
            plan.trade_size,
            plan.sell_price * (Decimal::ONE - trade_slippage),
        ) {
            Ok(sell) => self.submit_with_retry(&sell, &mut attempt.retry_count).await,
            Err(e) => Err(e),
        };
        let leg_b_failure = match submitted {
            Err(e) => {
                attempt.leg_b_status = LegStatus::SubmitFailed { reason: e.to_string() };
                e.to_string()
            }
            Ok(handle) => {
                attempt.leg_b_status = LegStatus::Submitted { tx_hash: handle.tx_hash.clone() };
                self.step(attempt, AttemptState::LegBSubmitted)?;
                match self.confirm(&handle).await {
                    LegOutcome::Confirmed(status) => {
                        attempt.leg_b_status = status;
                        self.step(attempt, AttemptState::Completed)?;
                        info!(
                            attempt_id = %attempt.id,
                            "✅ Both legs confirmed, expected profit {:.6}", plan.net_profit
                        );
                        return Ok(());
                    }
                    LegOutcome::Failed(status, reason) => {
                        attempt.leg_b_status = status;
                        reason
                    }
                }
            }
        };

        warn!(attempt_id = %attempt.id, "⚠️ Leg B failed with leg A filled: {}", leg_b_failure);
        attempt.failure_reason = Some(format!("leg B failed: {}", leg_b_failure));
        self.step(attempt, AttemptState::LegBFailed)?;
        self.unwind(attempt, &plan).await
    }

    /// Re-reads both chains and re-runs the evaluation before capital is committed.
    async fn validate(
        &self,
        original: &ArbitrageOpportunity,
    ) -> (ValidationResult, Option<ArbitrageOpportunity>) {
        let max_impact = self.config.max_pool_impact_pct;
        if original.is_expired_at(Utc::now()) {
            let market = MarketCheck::Unavailable("expired before re-read".to_string());
            return (revalidate_opportunity(original, market, max_impact, Utc::now()), None);
        }

        let (buy_quote, sell_quote) = tokio::join!(
            self.oracle.refresh(original.buy_chain),
            self.oracle.refresh(original.sell_chain),
        );

        match (buy_quote, sell_quote) {
            (Ok(buy_quote), Ok(sell_quote)) => {
                let now = Utc::now();
                let outcome = self.evaluator.assess_at(&buy_quote, &sell_quote, now);
                let pools = [&buy_quote.source_snapshot, &sell_quote.source_snapshot];
                let market = MarketCheck::Assessed { outcome: &outcome, pools: &pools };
                let result = revalidate_opportunity(original, market, max_impact, now);
                (result, outcome.ok())
            }
            (Err(e), _) | (_, Err(e)) => {
                let market = MarketCheck::Unavailable(e.to_string());
                (revalidate_opportunity(original, market, max_impact, Utc::now()), None)
            }
        }
    }

    /// Compensating sell of leg A's fill on the buy chain.
    async fn unwind(&self, attempt: &mut ExecutionAttempt, plan: &ArbitrageOpportunity) -> BotResult<()> {
        self.step(attempt, AttemptState::Unwinding)?;
        let chain_id = plan.buy_chain;
        let max_attempts = self.config.unwind_max_attempts.max(1);
        let mut last_failure = String::new();

        for number in 1..=max_attempts {
            attempt.unwind_attempts = number;
            self.publish(attempt);

            let reference = self
                .oracle
                .latest(chain_id)
                .filter(|q| !q.stale)
                .map(|q| q.price)
                .unwrap_or(plan.buy_price);
            let limit = reference * (Decimal::ONE - bps_to_fraction(self.config.unwind_slippage_bps));
            info!(attempt_id = %attempt.id, "↩️  Unwind {}/{} on {}", number, max_attempts, chain_id);
            let submitted = match self.trade_params(chain_id, TradeSide::Sell, plan.trade_size, limit) {
                Ok(params) => self.submit_once(&params).await,
                Err(e) => Err(e),
            };
            match submitted {
                Ok(handle) => {
                    attempt.unwind_status = LegStatus::Submitted { tx_hash: handle.tx_hash.clone() };
                    match self.confirm(&handle).await {
                        LegOutcome::Confirmed(status) => {
                            attempt.unwind_status = status;
                            info!(attempt_id = %attempt.id, "Position unwound on {}", chain_id);
                            return self.step(attempt, AttemptState::Unwound);
                        }
                        LegOutcome::Failed(status, reason) => {
                            attempt.unwind_status = status;
                            last_failure = reason;
                        }
                    }
                }
                Err(e) => {
                    attempt.unwind_status = LegStatus::SubmitFailed { reason: e.to_string() };
                    last_failure = e.to_string();
                }
            }

            warn!(attempt_id = %attempt.id, "Unwind {}/{} failed: {}", number, max_attempts, last_failure);
            if number < max_attempts {
                tokio::time::sleep(self.config.submit_retry.backoff_delay(number - 1)).await;
            }
        }

        let reason = format!("unwind exhausted after {} attempts: {}", max_attempts, last_failure);
        attempt.failure_reason = Some(reason.clone());
        self.step(attempt, AttemptState::IncidentRaised)?;

        let report = IncidentReport {
            attempt_id: attempt.id.clone(),
            chain_id,
            base_amount: plan.trade_size,
            reason: reason.clone(),
            raised_at: Utc::now(),
        };
        error!(
            attempt_id = %attempt.id,
            chain = %chain_id,
            amount = %plan.trade_size,
            "🚨 INCIDENT: {}", reason
        );
        self.latch_incident(report);
        Ok(())
    }

    fn fail_leg_a(&self, attempt: &mut ExecutionAttempt, reason: String) -> BotResult<()> {
        warn!(attempt_id = %attempt.id, "❌ Leg A failed: {}", reason);
        attempt.failure_reason = Some(format!("leg A failed: {}", reason));
        self.step(attempt, AttemptState::LegAFailed)?;
        self.step(attempt, AttemptState::Failed)
    }

    fn trade_params(
        &self,
        chain_id: ChainId,
        side: TradeSide,
        base_amount: Decimal,
        limit_price: Decimal,
    ) -> BotResult<TradeParams> {
        let endpoint = self.registry.get(chain_id)?;
        Ok(TradeParams {
            chain_id,
            pool: endpoint.pool,
            side,
            base_amount,
            limit_price,
            deadline: Utc::now() + chrono_duration(self.config.trade_deadline),
        })
    }

    async fn submit_with_retry(
        &self,
        params: &TradeParams,
        retry_count: &mut u32,
    ) -> BotResult<TransactionHandle> {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let context = format!("{:?} on {}", params.side, params.chain_id);

        let result = retry_with_backoff(
            move || async move {
                calls.fetch_add(1, Ordering::Relaxed);
                self.submit_once(params).await
            },
            &self.config.submit_retry,
            &context,
        )
        .await;

        *retry_count += counter.load(Ordering::Relaxed).saturating_sub(1);
        result
    }

    async fn submit_once(&self, params: &TradeParams) -> BotResult<TransactionHandle> {
        let connection = self.connection(params.chain_id)?;
        let result = tokio::time::timeout(self.config.submit_timeout, connection.submit_trade(params))
            .await
            .unwrap_or_else(|_| {
                Err(BotError::SubmitFailure {
                    chain_id: params.chain_id,
                    message: format!("submission timed out after {:?}", self.config.submit_timeout),
                    source: None,
                })
            });

        let outcome = if result.is_ok() {
            ConnectionOutcome::SubmitSucceeded
        } else {
            ConnectionOutcome::SubmitFailed
        };
        self.health.report(params.chain_id, outcome);
        result
    }

    async fn confirm(&self, handle: &TransactionHandle) -> LegOutcome {
        let tx_hash = handle.tx_hash.clone();
        let timeout = self.config.confirmation_timeout;
        let status = match self.connection(handle.chain_id) {
            Ok(connection) => {
                // Grace period on top of the connection's own bound
                tokio::time::timeout(timeout + Duration::from_secs(1), connection.await_confirmation(handle, timeout))
                    .await
                    .unwrap_or(Ok(ConfirmationStatus::TimedOut))
            }
            Err(e) => Err(e),
        };

        match status {
            Ok(ConfirmationStatus::Confirmed { block }) => {
                info!(chain = %handle.chain_id, block, "⛓️  {} confirmed", tx_hash);
                LegOutcome::Confirmed(LegStatus::Confirmed { tx_hash, block })
            }
            Ok(ConfirmationStatus::Reverted { reason }) => {
                let message = BotError::Reverted {
                    chain_id: handle.chain_id,
                    tx_hash: tx_hash.clone(),
                    reason: reason.clone(),
                }
                .to_string();
                LegOutcome::Failed(LegStatus::Reverted { tx_hash, reason }, message)
            }
            Ok(ConfirmationStatus::TimedOut) => {
                let message = BotError::TimedOut {
                    chain_id: handle.chain_id,
                    operation: format!("confirmation of {}", tx_hash),
                    after: timeout,
                }
                .to_string();
                LegOutcome::Failed(LegStatus::TimedOut { tx_hash }, message)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(chain = %handle.chain_id, "Could not determine outcome of {}: {}", tx_hash, reason);
                LegOutcome::Failed(LegStatus::Unconfirmed { tx_hash, reason: reason.clone() }, reason)
            }
        }
    }

    fn connection(&self, chain_id: ChainId) -> BotResult<&Arc<dyn ChainConnection>> {
        Ok(&self.registry.get(chain_id)?.connection)
    }

    fn step(&self, attempt: &mut ExecutionAttempt, next: AttemptState) -> BotResult<()> {
        let from = attempt.state;
        attempt.transition(next)?;
        info!(attempt_id = %attempt.id, "{} → {}", from, next);
        self.publish(attempt);
        Ok(())
    }

    fn publish(&self, attempt: &ExecutionAttempt) {
        *lock(&self.current) = Some(attempt.clone());
    }

    fn latch_incident(&self, report: IncidentReport) {
        let mut incident = lock(&self.incident);
        if incident.is_none() {
            *incident = Some(report);
        }
    }

    fn archive(&self, attempt: ExecutionAttempt) {
        if let Some(dir) = &self.config.archive_dir {
            if let Err(e) = save_execution_attempt(dir, &attempt) {
                warn!(attempt_id = %attempt.id, "Failed to archive attempt: {}", e);
            }
        }

        let mut history = lock(&self.history);
        history.push_back(attempt);
        while history.len() > self.config.history_limit.max(1) {
            history.pop_front();
        }
    }
}
