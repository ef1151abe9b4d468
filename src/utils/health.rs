//! Health report logging

use tracing::{info, warn};
use crate::types::{HealthReport, HealthStatus};

pub fn log_health_report(report: &HealthReport) {
    let summary: Vec<String> = report
        .chains
        .iter()
        .map(|c| {
            let last_read = c
                .last_successful_read_at
                .map(|t| format!("{}ms ago", (report.generated_at - t).num_milliseconds()))
                .unwrap_or_else(|| "never".to_string());
            format!(
                "{}={} (failures={}, last read {})",
                c.chain_id, c.status, c.consecutive_failures, last_read
            )
        })
        .collect();

    match report.overall {
        HealthStatus::Healthy => info!("🏥 Health Check: {}", summary.join(", ")),
        _ => warn!("🏥 Health Check [{}]: {}", report.overall, summary.join(", ")),
    }
}
