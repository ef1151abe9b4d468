//! Display and printing utilities

use chrono::Utc;
use tracing::{error, info, warn};
use crate::{
    engine::SessionStats,
    types::{ArbitrageOpportunity, AttemptState, ExecutionAttempt, LegStatus},
};

pub fn print_session_stats(stats: &SessionStats, circuit_breaker_open: bool) {
    let runtime = (Utc::now() - stats.started_at).num_minutes();

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 ARBITRAGE:");
    info!("     Evaluation cycles: {} ({} skipped)", stats.cycles, stats.skipped_cycles);
    info!("     Opportunities: {}", stats.opportunities);
    info!("     Total potential profit: {:.6}", stats.potential_profit);

    info!("   🚀 EXECUTION:");
    info!("     Attempts: {}", stats.attempts);
    info!("     Completed: {} ({:.1}%)", stats.completed, stats.success_rate_pct());
    info!("     Rejected: {}, Failed: {}", stats.rejected, stats.failed);
    info!("     Unwound: {}, Incidents: {}", stats.unwound, stats.incidents);
    info!("     Skipped while in flight: {}", stats.already_in_flight);
    info!("     Expected profit captured: {:.6}", stats.expected_profit_captured);

    info!("   ⚙️  SYSTEM:");
    info!("     Circuit breaker: {}", if circuit_breaker_open { "OPEN" } else { "CLOSED" });
    info!("");
}

pub fn print_arbitrage_opportunity(opportunity: &ArbitrageOpportunity) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY #{}", opportunity.id);
    warn!("📋 Strategy: {}", opportunity.direction());
    warn!("💰 Profit Analysis:");
    warn!("   Buy Price:  {:.6}", opportunity.buy_price);
    warn!("   Sell Price: {:.6}", opportunity.sell_price);
    warn!("   Gap: {:.3}% on {} base", opportunity.price_difference_pct, opportunity.trade_size);
    warn!("   Gross: {:.6} | Cost: {:.6}", opportunity.estimated_gross_profit, opportunity.estimated_cost);
    warn!("   Net Profit: {:.6}", opportunity.net_profit);
    warn!("⏳ Valid for {}ms", (opportunity.valid_until - opportunity.detected_at).num_milliseconds());
}

fn leg_summary(status: &LegStatus) -> String {
    match status {
        LegStatus::NotStarted => "not started".to_string(),
        LegStatus::Submitted { tx_hash } => format!("submitted {}", tx_hash),
        LegStatus::Confirmed { tx_hash, block } => format!("confirmed {} @ {}", tx_hash, block),
        LegStatus::Reverted { tx_hash, reason } => format!("reverted {} ({})", tx_hash, reason),
        LegStatus::TimedOut { tx_hash } => format!("timed out {}", tx_hash),
        LegStatus::Unconfirmed { tx_hash, reason } => format!("unconfirmed {} ({})", tx_hash, reason),
        LegStatus::SubmitFailed { reason } => format!("submit failed ({})", reason),
    }
}

pub fn print_execution_attempt(attempt: &ExecutionAttempt) {
    let elapsed_ms = attempt
        .finished_at
        .map(|f| (f - attempt.started_at).num_milliseconds())
        .unwrap_or_default();
    let path: Vec<String> = attempt.state_path().iter().map(|s| s.to_string()).collect();

    match attempt.state {
        AttemptState::Completed | AttemptState::Rejected => {
            warn!("\n✅ EXECUTION ATTEMPT #{} → {}", attempt.id, attempt.state);
        }
        AttemptState::IncidentRaised => {
            error!("\n🚨 EXECUTION ATTEMPT #{} → {}", attempt.id, attempt.state);
        }
        _ => {
            error!("\n❌ EXECUTION ATTEMPT #{} → {}", attempt.id, attempt.state);
        }
    }
    warn!("   Path: {}", path.join(" → "));
    warn!("   Leg A: {}", leg_summary(&attempt.leg_a_status));
    warn!("   Leg B: {}", leg_summary(&attempt.leg_b_status));
    if attempt.unwind_attempts > 0 {
        warn!("   Unwind ({} tries): {}", attempt.unwind_attempts, leg_summary(&attempt.unwind_status));
    }
    if let Some(reason) = &attempt.failure_reason {
        warn!("   Reason: {}", reason);
    }
    warn!("   Submission retries: {}", attempt.retry_count);
    warn!("   Duration: {}ms", elapsed_ms);
}
