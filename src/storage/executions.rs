//! Execution attempt archive

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;
use crate::types::ExecutionAttempt;

/// Appends a terminal attempt to `<output>/executions/attempts_<date>.jsonl`.
pub fn save_execution_attempt(output_dir: &Path, attempt: &ExecutionAttempt) -> Result<()> {
    let dir = output_dir.join("executions");
    fs::create_dir_all(&dir)?;
    let filename = dir.join(format!("attempts_{}.jsonl", Utc::now().format("%Y-%m-%d")));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)
        .with_context(|| format!("Failed to open {}", filename.display()))?;

    writeln!(file, "{}", serde_json::to_string(attempt)?)?;

    info!(
        attempt_id = %attempt.id,
        state = %attempt.state,
        incident = attempt.incident_flag,
        "Saved execution attempt"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArbitrageOpportunity, ChainId};
    use rust_decimal_macros::dec;

    #[test]
    fn test_appends_one_line_per_attempt() {
        let dir = std::env::temp_dir().join(format!("xchain-arb-{}", uuid::Uuid::new_v4()));
        let now = Utc::now();
        let attempt = ExecutionAttempt::new(ArbitrageOpportunity {
            id: "opp".to_string(),
            buy_chain: ChainId(1),
            sell_chain: ChainId(2),
            buy_price: dec!(2),
            sell_price: dec!(2.1),
            trade_size: dec!(1),
            price_difference_pct: dec!(5),
            estimated_gross_profit: dec!(0.1),
            estimated_cost: dec!(0.02),
            net_profit: dec!(0.08),
            detected_at: now,
            valid_until: now,
        });

        save_execution_attempt(&dir, &attempt).unwrap();
        save_execution_attempt(&dir, &attempt).unwrap();

        let file = dir
            .join("executions")
            .join(format!("attempts_{}.jsonl", Utc::now().format("%Y-%m-%d")));
        let contents = fs::read_to_string(file).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["id"], attempt.id.as_str());
        assert_eq!(first["state"], "Idle");

        fs::remove_dir_all(dir).ok();
    }
}
