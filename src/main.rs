//! Cross-Chain Arbitrage Bot - Main Entry Point

use xchain_arb_bot::*;
use anyhow::{Context, Result};
use alloy::providers::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use xchain_arb_bot::{
    config::ChainConfig,
    execution::SimulatedChainConnection,
    network::{setup_chain_provider, AlloyChainConnection},
};

const SIMULATED_CONFIRMATION_LATENCY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = CONFIG.clone();

    utils::setup_output_directories(&config.output_dir)?;
    let _logging_guard = utils::setup_logging(&config.output_dir)?;

    info!("🌉 Cross-Chain Arbitrage Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    for chain in config.chains() {
        info!("   {} pool {:?}, fee {} bps", chain.label(), chain.pool_address, chain.fee_bps);
    }
    info!("   Trade Size: {}", config.trade_size);
    info!("   Min Price Gap: {}%", config.min_price_diff_pct);
    info!("   Freshness Bound: {}ms, Max Skew: {}ms", config.freshness_bound_ms, config.max_quote_skew_ms);
    info!("   Trade Execution: {}", if config.enable_trade_execution { "LIVE" } else { "SIMULATED" });
    if !config.enable_trade_execution {
        info!("   Simulated revert rate: {:.1}%", config.simulated_failure_rate * 100.0);
    }

    config.validate().context("Invalid configuration")?;

    // Providers and startup pool validation
    let private_key = config
        .private_key
        .as_deref()
        .filter(|_| config.enable_trade_execution);
    let mut providers: Vec<(&ChainConfig, Arc<dyn Provider>, Option<alloy::primitives::Address>)> = Vec::new();
    for chain in config.chains() {
        let chain_provider = setup_chain_provider(chain, private_key)
            .await
            .with_context(|| format!("Failed to set up {}", chain.label()))?;
        providers.push((chain, chain_provider.provider, chain_provider.signer_address));
    }

    let to_validate: Vec<(&ChainConfig, Arc<dyn Provider>)> = providers
        .iter()
        .map(|(chain, provider, _)| (*chain, provider.clone()))
        .collect();
    pools::initialize_and_validate_pools(&to_validate).await?;

    let mut registry = ChainRegistry::new();
    for (chain, provider, signer) in providers {
        let recipient = signer.unwrap_or_default();
        let live: Arc<dyn ChainConnection> =
            Arc::new(AlloyChainConnection::new(chain.clone(), provider, recipient));
        let connection: Arc<dyn ChainConnection> = if config.enable_trade_execution {
            live
        } else {
            Arc::new(SimulatedChainConnection::new(
                live,
                SIMULATED_CONFIRMATION_LATENCY,
                config.simulated_failure_rate,
            ))
        };
        registry.register(connection, chain.pool()?);
    }

    let engine = Arc::new(ArbitrageEngine::new(config.engine_config(), registry)?);

    // Shutdown handler
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("\n📛 Received shutdown signal (Ctrl+C)..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    let feeds = engine.spawn_price_feeds(&shutdown_rx);
    engine.run(shutdown_rx).await;

    for feed in feeds {
        if let Err(e) = feed.await {
            warn!("Price feed task ended abnormally: {}", e);
        }
    }

    info!("\n🛑 Shutting down gracefully...");
    if let Some(report) = engine.incident() {
        error!(
            "🚨 Unresolved incident from attempt {}: {} {} on {}",
            report.attempt_id, report.reason, report.base_amount, report.chain_id
        );
    }
    engine.print_stats().await;

    Ok(())
}
