//! Retry logic with exponential backoff

use std::future::Future;
use std::time::Duration;
use tracing::warn;
use crate::errors::BotResult;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total tries including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Config allowing `retries` extra tries after the first failure.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries + 1,
            ..Default::default()
        }
    }

    pub fn retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Delay before retry number `retry` (0-based), without jitter.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let grown = self.initial_delay_ms as f64 * self.exponential_base.powi(retry as i32);
        Duration::from_millis(grown.min(self.max_delay_ms as f64) as u64)
    }

    fn next_delay(&self, delay_ms: u64) -> u64 {
        let grown = ((delay_ms as f64) * self.exponential_base) as u64;
        let capped = grown.min(self.max_delay_ms);
        // +/-5% jitter
        let jitter = capped as f64 * 0.1 * (rand::random::<f64>() - 0.5);
        ((capped as f64) + jitter).max(0.0) as u64
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// `config.max_attempts` is spent. The last error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    context: &str,
) -> BotResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BotResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt, max_attempts, context, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BotError;
    use crate::types::ChainId;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> BotError {
        BotError::SubmitFailure {
            chain_id: ChainId(1),
            message: "nonce conflict".to_string(),
            source: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_with_backoff(
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            },
            &RetryConfig::with_retries(2),
            "test op",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: BotResult<()> = retry_with_backoff(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            },
            &RetryConfig::with_retries(2),
            "test op",
        )
        .await;

        assert!(matches!(result, Err(BotError::SubmitFailure { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_reverts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: BotResult<()> = retry_with_backoff(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BotError::Reverted {
                    chain_id: ChainId(1),
                    tx_hash: "0x1".to_string(),
                    reason: "slippage".to_string(),
                })
            },
            &RetryConfig::default(),
            "test op",
        )
        .await;

        assert!(matches!(result, Err(BotError::Reverted { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(800));
        assert_eq!(config.backoff_delay(20), Duration::from_millis(5000));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 1500,
            exponential_base: 4.0,
        };
        let next = config.next_delay(1000);
        assert!(next <= 1575 && next >= 1425, "delay {next} outside jitter band");
    }
}
