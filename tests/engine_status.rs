//! Engine loop, circuit breaker and status surface

mod common;

use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};
use xchain_arb_bot::{arbitrage::SkipReason, engine::CycleOutcome, HealthStatus};

#[tokio::test(start_paused = true)]
async fn test_latest_prices_and_health_after_refresh() {
    let (a, b) = mock_pair();
    let engine = engine(&a, &b);

    let prices = engine.latest_prices();
    assert!(prices.chain_a.is_none() && prices.chain_b.is_none());
    assert_eq!(engine.health().overall, HealthStatus::Down);

    let quote = assert_ok!(engine.oracle().refresh(CHAIN_A).await);
    assert_eq!(quote.price, dec!(2));
    assert_ok!(engine.oracle().refresh(CHAIN_B).await);

    let prices = engine.latest_prices();
    assert_eq!(prices.chain_a.unwrap().price, dec!(2));
    assert_eq!(prices.chain_b.unwrap().price, dec!(2.1));
    assert_eq!(engine.health().overall, HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_read_failure_keeps_previous_quote() {
    let (a, b) = mock_pair();
    let engine = engine(&a, &b);
    prime_prices(&engine).await;

    a.fail_reads(1);
    assert_err!(engine.oracle().refresh(CHAIN_A).await);
    assert_eq!(engine.latest_prices().chain_a.unwrap().price, dec!(2));
    assert_eq!(engine.health().chain(CHAIN_A).unwrap().consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_below_threshold_is_skipped() {
    let (a, b) = mock_pair();
    b.set_reserves(dec!(1000), dec!(2010));
    let engine = engine(&a, &b);
    prime_prices(&engine).await;

    let outcome = engine.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Skipped(SkipReason::BelowThreshold { .. })));
    assert!(a.submitted().is_empty());
    assert_eq!(engine.session_stats().opportunities, 0);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_pauses_after_failed_cycles() {
    let (a, b) = mock_pair();
    let engine = engine(&a, &b);

    // No quotes yet: each cycle counts as a failure
    for _ in 0..3 {
        assert!(matches!(engine.run_cycle().await, CycleOutcome::AwaitingPrices));
    }
    assert!(matches!(engine.run_cycle().await, CycleOutcome::Paused { .. }));
    assert!(engine.status().await.circuit_breaker_open);

    tokio::time::advance(Duration::from_secs(61)).await;
    prime_prices(&engine).await;
    assert!(matches!(engine.run_cycle().await, CycleOutcome::Executed(_)));
    assert!(!engine.status().await.circuit_breaker_open);
}

#[tokio::test(start_paused = true)]
async fn test_status_snapshot_serializes() {
    let (a, b) = mock_pair();
    let engine = engine(&a, &b);
    prime_prices(&engine).await;
    engine.run_cycle().await;

    let status = engine.status().await;
    assert!(status.enabled);
    assert!(!status.in_flight);
    assert!(status.current_attempt.is_none());
    assert!(status.incident.is_none());
    assert_eq!(status.stats.completed, 1);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["enabled"], true);
    assert_eq!(json["health"]["overall"], "Healthy");
    assert_eq!(json["latest_prices"]["chain_a"]["chain_id"], 8453);
}

#[tokio::test(start_paused = true)]
async fn test_toggling_enabled_gates_new_attempts() {
    let (a, b) = mock_pair();
    let engine = engine(&a, &b);
    prime_prices(&engine).await;

    engine.set_enabled(false);
    assert!(!engine.is_enabled());
    assert!(matches!(engine.run_cycle().await, CycleOutcome::Detected(_)));

    engine.set_enabled(true);
    prime_prices(&engine).await;
    assert!(matches!(engine.run_cycle().await, CycleOutcome::Executed(_)));
    assert_eq!(a.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_trades_until_shutdown() {
    let (a, b) = mock_pair();
    let engine = Arc::new(engine(&a, &b));
    let (stop_tx, stop_rx) = watch::channel(false);

    let feeds = engine.spawn_price_feeds(&stop_rx);
    let runner = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run(stop_rx).await }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    stop_tx.send(true).unwrap();
    runner.await.unwrap();
    for feed in feeds {
        feed.await.unwrap();
    }

    assert!(!engine.recent_attempts().is_empty());
    assert!(engine.session_stats().cycles > 0);
    assert!(engine.current_attempt_state().is_none());
}
