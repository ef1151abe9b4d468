//! Opportunity log

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;
use crate::types::ArbitrageOpportunity;

pub fn save_opportunity(output_dir: &Path, opportunity: &ArbitrageOpportunity) -> Result<()> {
    let dir = output_dir.join("opportunities");
    fs::create_dir_all(&dir)?;
    let filename = dir.join(format!("opportunities_{}.jsonl", Utc::now().format("%Y-%m-%d")));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)
        .with_context(|| format!("Failed to open {}", filename.display()))?;

    writeln!(file, "{}", serde_json::to_string(opportunity)?)?;

    debug!(opportunity_id = %opportunity.id, "Saved opportunity");
    Ok(())
}
