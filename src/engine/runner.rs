//! Arbitrage engine: owns the components and drives evaluation

use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use crate::{
    arbitrage::{EvaluatorConfig, OpportunityEvaluator, SkipReason},
    engine::{LatestPrices, SessionStats, StatusSnapshot},
    errors::{BotResult, CircuitBreaker},
    execution::{ExecutionConfig, ExecutionCoordinator},
    health::{HealthConfig, HealthTracker},
    network::ChainRegistry,
    oracle::{OracleConfig, PriceOracle},
    storage::save_opportunity,
    types::{
        ArbitrageOpportunity, AttemptState, ChainId, ExecutionAttempt, ExecutionResult,
        HealthReport, IncidentReport,
    },
    utils::{log_health_report, print_arbitrage_opportunity, print_execution_attempt, print_session_stats},
};

const STATS_EVERY_CYCLES: u64 = 300;
const HEALTH_EVERY_CYCLES: u64 = 30;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chain_a: ChainId,
    pub chain_b: ChainId,
    pub oracle: OracleConfig,
    pub evaluator: EvaluatorConfig,
    pub execution: ExecutionConfig,
    pub health: HealthConfig,
    pub evaluation_interval: Duration,
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown: Duration,
    /// Opportunities are logged under `<output_dir>/opportunities` when set.
    pub output_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(chain_a: ChainId, chain_b: ChainId) -> Self {
        Self {
            chain_a,
            chain_b,
            oracle: OracleConfig::default(),
            evaluator: EvaluatorConfig::default(),
            execution: ExecutionConfig::default(),
            health: HealthConfig::default(),
            evaluation_interval: Duration::from_secs(1),
            max_consecutive_errors: 5,
            circuit_breaker_cooldown: Duration::from_secs(60),
            output_dir: None,
        }
    }
}

/// What one evaluation cycle did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The circuit breaker is open.
    Paused { remaining: Option<Duration> },
    /// At least one chain has never published a quote.
    AwaitingPrices,
    Skipped(SkipReason),
    /// Found but not executed because execution is disabled.
    Detected(ArbitrageOpportunity),
    Executed(ExecutionResult),
}

impl CycleOutcome {
    /// Cycles that count against the circuit breaker.
    fn is_failure(&self) -> bool {
        match self {
            CycleOutcome::Skipped(reason) => matches!(
                reason,
                SkipReason::Stale { .. } | SkipReason::ChainDown { .. }
            ),
            CycleOutcome::Executed(result) => matches!(
                result.final_state(),
                Some(AttemptState::Failed | AttemptState::Unwound | AttemptState::IncidentRaised)
            ),
            CycleOutcome::AwaitingPrices => true,
            CycleOutcome::Paused { .. } | CycleOutcome::Detected(_) => false,
        }
    }
}

pub struct ArbitrageEngine {
    chain_a: ChainId,
    chain_b: ChainId,
    health: Arc<HealthTracker>,
    oracle: Arc<PriceOracle>,
    evaluator: Arc<OpportunityEvaluator>,
    coordinator: Arc<ExecutionCoordinator>,
    circuit_breaker: CircuitBreaker,
    stats: Mutex<SessionStats>,
    evaluation_interval: Duration,
    output_dir: Option<PathBuf>,
}

impl ArbitrageEngine {
    pub fn new(config: EngineConfig, registry: ChainRegistry) -> BotResult<Self> {
        registry.get(config.chain_a)?;
        registry.get(config.chain_b)?;

        let health = Arc::new(HealthTracker::new(config.health, &[config.chain_a, config.chain_b]));
        let oracle = Arc::new(PriceOracle::new(config.oracle, registry.clone(), health.clone()));
        let evaluator = Arc::new(OpportunityEvaluator::new(config.evaluator, health.clone()));
        let coordinator = Arc::new(ExecutionCoordinator::new(
            config.execution,
            registry,
            oracle.clone(),
            evaluator.clone(),
            health.clone(),
        ));

        Ok(Self {
            chain_a: config.chain_a,
            chain_b: config.chain_b,
            health,
            oracle,
            evaluator,
            coordinator,
            circuit_breaker: CircuitBreaker::new(config.max_consecutive_errors, config.circuit_breaker_cooldown),
            stats: Mutex::new(SessionStats::new(Utc::now())),
            evaluation_interval: config.evaluation_interval,
            output_dir: config.output_dir,
        })
    }

    pub fn oracle(&self) -> &Arc<PriceOracle> {
        &self.oracle
    }

    pub fn evaluator(&self) -> &Arc<OpportunityEvaluator> {
        &self.evaluator
    }

    pub fn coordinator(&self) -> &Arc<ExecutionCoordinator> {
        &self.coordinator
    }

    /// Starts one refresh loop per chain.
    pub fn spawn_price_feeds(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        [self.chain_a, self.chain_b]
            .into_iter()
            .map(|chain_id| self.oracle.spawn_refresh_loop(chain_id, shutdown.clone()))
            .collect()
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        if !self.circuit_breaker.can_proceed().await {
            let remaining = self.circuit_breaker.cooldown_remaining().await;
            debug!("⚡ Circuit breaker is OPEN, {:?} left", remaining);
            return CycleOutcome::Paused { remaining };
        }

        let outcome = self.evaluate_and_execute().await;

        if outcome.is_failure() {
            if self.circuit_breaker.record_error().await {
                error!("Circuit breaker activated after repeated failed cycles");
            }
        } else {
            self.circuit_breaker.record_success().await;
        }
        outcome
    }

    async fn evaluate_and_execute(&self) -> CycleOutcome {
        let now = Utc::now();
        let (Some(quote_a), Some(quote_b)) = (
            self.oracle.latest_at(self.chain_a, now),
            self.oracle.latest_at(self.chain_b, now),
        ) else {
            self.stats().skipped_cycles += 1;
            return CycleOutcome::AwaitingPrices;
        };

        self.stats().cycles += 1;
        let opportunity = match self.evaluator.assess_at(&quote_a, &quote_b, now) {
            Ok(opportunity) => opportunity,
            Err(reason) => {
                debug!(
                    "💹 {} {:.6} | {} {:.6} | {}",
                    quote_a.chain_id, quote_a.price, quote_b.chain_id, quote_b.price, reason
                );
                self.stats().skipped_cycles += 1;
                return CycleOutcome::Skipped(reason);
            }
        };

        {
            let mut stats = self.stats();
            stats.opportunities += 1;
            stats.potential_profit += opportunity.net_profit;
        }
        print_arbitrage_opportunity(&opportunity);
        if let Some(dir) = &self.output_dir {
            if let Err(e) = save_opportunity(dir, &opportunity) {
                error!("Failed to save arbitrage opportunity: {}", e);
            }
        }

        if !self.coordinator.is_enabled() {
            info!("Execution disabled, opportunity {} not attempted", opportunity.id);
            return CycleOutcome::Detected(opportunity);
        }

        let result = self.coordinator.attempt(opportunity).await;
        match &result {
            ExecutionResult::Finished(attempt) => print_execution_attempt(attempt),
            ExecutionResult::AlreadyInFlight => debug!("Attempt already in flight, skipping"),
            ExecutionResult::Disabled => debug!("Execution disabled mid-cycle"),
            ExecutionResult::Halted(report) => warn!(
                attempt_id = %report.attempt_id,
                "🚨 Halted until incident is cleared: {}", report.reason
            ),
        }
        self.stats().record_result(&result);
        CycleOutcome::Executed(result)
    }

    /// Runs cycles at the evaluation cadence until `shutdown` flips.
    /// A cycle in progress always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.evaluation_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("\n🚀 Evaluating every {:?}...\n", self.evaluation_interval);

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                    ticks += 1;
                    if ticks % HEALTH_EVERY_CYCLES == 0 {
                        log_health_report(&self.health());
                    }
                    if ticks % STATS_EVERY_CYCLES == 0 {
                        self.print_stats().await;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, evaluation loop stopping");
                        break;
                    }
                }
            }
        }
    }

    pub async fn print_stats(&self) {
        let stats = self.session_stats();
        print_session_stats(&stats, self.circuit_breaker.is_open().await);
    }

    pub fn latest_prices(&self) -> LatestPrices {
        LatestPrices {
            chain_a: self.oracle.latest(self.chain_a),
            chain_b: self.oracle.latest(self.chain_b),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.coordinator.is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.coordinator.set_enabled(enabled);
    }

    pub fn current_attempt_state(&self) -> Option<ExecutionAttempt> {
        self.coordinator.current_attempt_state()
    }

    pub fn health(&self) -> HealthReport {
        self.health.status()
    }

    pub fn incident(&self) -> Option<IncidentReport> {
        self.coordinator.incident()
    }

    pub fn clear_incident(&self) -> Option<IncidentReport> {
        self.coordinator.clear_incident()
    }

    pub fn recent_attempts(&self) -> Vec<ExecutionAttempt> {
        self.coordinator.recent_attempts()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.stats().clone()
    }

    pub async fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            generated_at: Utc::now(),
            enabled: self.is_enabled(),
            in_flight: self.coordinator.is_in_flight(),
            latest_prices: self.latest_prices(),
            health: self.health(),
            current_attempt: self.current_attempt_state(),
            incident: self.incident(),
            circuit_breaker_open: self.circuit_breaker.is_open().await,
            stats: self.session_stats(),
        }
    }

    fn stats(&self) -> MutexGuard<'_, SessionStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
