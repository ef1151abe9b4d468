//! Conversions between std and chrono durations

use std::time::Duration;

/// Saturates instead of failing on durations chrono cannot represent.
pub fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
