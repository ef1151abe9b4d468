//! Validation result types

use serde::Serialize;

/// Outcome of the pre-commit re-check an attempt runs while `Validating`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationResult {
    pub not_expired: bool,
    pub threshold_cleared: bool,
    pub direction_unchanged: bool,
    pub profit_positive: bool,
    pub pool_impact_acceptable: bool,
    pub all_passed: bool,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        if self.warnings.is_empty() {
            "all checks passed".to_string()
        } else {
            self.warnings.join("; ")
        }
    }
}
