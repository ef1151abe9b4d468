//! Price oracle: one refresh loop and one quote slot per chain

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use crate::{
    errors::{BotError, BotResult},
    health::HealthTracker,
    network::ChainRegistry,
    oracle::spot_price,
    types::{ChainId, ConnectionOutcome, PriceQuote},
    utils::chrono_duration,
};

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub refresh_interval: Duration,
    pub read_timeout: Duration,
    pub freshness_bound: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            read_timeout: Duration::from_secs(3),
            freshness_bound: Duration::from_secs(3),
        }
    }
}

pub struct PriceOracle {
    config: OracleConfig,
    registry: ChainRegistry,
    health: Arc<HealthTracker>,
    slots: HashMap<ChainId, watch::Sender<Option<PriceQuote>>>,
}

impl PriceOracle {
    pub fn new(config: OracleConfig, registry: ChainRegistry, health: Arc<HealthTracker>) -> Self {
        let slots = registry
            .chain_ids()
            .into_iter()
            .map(|id| (id, watch::Sender::new(None)))
            .collect();
        Self { config, registry, health, slots }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.registry.chain_ids()
    }

    /// Reads the pool once and publishes the resulting quote.
    ///
    /// On failure the held quote is kept, flagged stale if it has aged out,
    /// and the error is returned for the caller to log.
    pub async fn refresh(&self, chain_id: ChainId) -> BotResult<PriceQuote> {
        let endpoint = self.registry.get(chain_id)?;
        let slot = self.slot(chain_id)?;

        let read = tokio::time::timeout(
            self.config.read_timeout,
            endpoint.connection.read_pool_reserves(endpoint.pool),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BotError::ReadFailure {
                chain_id,
                message: format!("pool read timed out after {:?}", self.config.read_timeout),
                source: None,
            })
        });

        let priced = read.and_then(|snapshot| spot_price(&snapshot).map(|price| (snapshot, price)));
        let (snapshot, price) = match priced {
            Ok(priced) => priced,
            Err(e) => {
                self.health.report(chain_id, ConnectionOutcome::ReadFailed);
                self.mark_stale_if_aged(slot, Utc::now());
                return Err(e);
            }
        };
        self.health.report(chain_id, ConnectionOutcome::ReadSucceeded);

        let quote = PriceQuote {
            chain_id,
            price,
            source_snapshot: snapshot,
            computed_at: Utc::now(),
            stale: false,
        };

        let mut lagging = None;
        slot.send_if_modified(|held| match held {
            Some(current)
                if current.source_snapshot.observed_at_block > quote.source_snapshot.observed_at_block =>
            {
                lagging = Some(current.clone());
                false
            }
            _ => {
                *held = Some(quote.clone());
                true
            }
        });

        if let Some(current) = lagging {
            warn!(
                chain = %chain_id,
                held_block = current.source_snapshot.observed_at_block,
                read_block = quote.source_snapshot.observed_at_block,
                "Ignoring snapshot from a lagging node"
            );
            return Ok(current.observed_at(Utc::now(), self.freshness()));
        }

        debug!(
            chain = %chain_id,
            block = quote.source_snapshot.observed_at_block,
            "💱 Price {:.6}", quote.price
        );
        Ok(quote)
    }

    /// Last published quote with `stale` evaluated against the current time.
    /// Never touches the network.
    pub fn latest(&self, chain_id: ChainId) -> Option<PriceQuote> {
        self.latest_at(chain_id, Utc::now())
    }

    pub fn latest_at(&self, chain_id: ChainId, now: DateTime<Utc>) -> Option<PriceQuote> {
        let slot = self.slots.get(&chain_id)?;
        let held = slot.borrow();
        held.as_ref().map(|q| q.observed_at(now, self.freshness()))
    }

    /// Change notifications for one chain's quote slot.
    pub fn subscribe(&self, chain_id: ChainId) -> Option<watch::Receiver<Option<PriceQuote>>> {
        self.slots.get(&chain_id).map(|slot| slot.subscribe())
    }

    /// Refreshes `chain_id` every `refresh_interval` until `shutdown` flips.
    /// A failed refresh is logged and the schedule carries on.
    pub fn spawn_refresh_loop(
        self: &Arc<Self>,
        chain_id: ChainId,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let oracle = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(oracle.config.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(chain = %chain_id, "🔄 Price refresh every {:?}", oracle.config.refresh_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = oracle.refresh(chain_id).await {
                            warn!(chain = %chain_id, "Price refresh failed: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(chain = %chain_id, "Price refresh stopped");
        })
    }

    fn slot(&self, chain_id: ChainId) -> BotResult<&watch::Sender<Option<PriceQuote>>> {
        self.slots.get(&chain_id).ok_or_else(|| BotError::Configuration {
            message: format!("no price slot for {}", chain_id),
        })
    }

    fn mark_stale_if_aged(&self, slot: &watch::Sender<Option<PriceQuote>>, now: DateTime<Utc>) {
        let bound = self.freshness();
        slot.send_if_modified(|held| match held {
            Some(quote) if !quote.stale && quote.is_stale_at(now, bound) => {
                quote.stale = true;
                true
            }
            _ => false,
        });
    }

    fn freshness(&self) -> chrono::Duration {
        chrono_duration(self.config.freshness_bound)
    }
}
