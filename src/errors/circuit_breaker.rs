//! Circuit breaker guarding the evaluation loop

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info};

pub struct CircuitBreaker {
    pub consecutive_errors: Arc<RwLock<u32>>,
    pub is_open: Arc<RwLock<bool>>,
    pub last_error_time: Arc<RwLock<Option<Instant>>>,
    pub max_consecutive_errors: u32,
    pub cooldown_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_errors: u32, cooldown: Duration) -> Self {
        Self {
            consecutive_errors: Arc::new(RwLock::new(0)),
            is_open: Arc::new(RwLock::new(false)),
            last_error_time: Arc::new(RwLock::new(None)),
            max_consecutive_errors: max_consecutive_errors.max(1),
            cooldown_duration: cooldown,
        }
    }

    pub async fn record_success(&self) {
        *self.consecutive_errors.write().await = 0;
        *self.is_open.write().await = false;
    }

    /// Returns true when this error tripped the breaker.
    pub async fn record_error(&self) -> bool {
        let mut errors = self.consecutive_errors.write().await;
        *errors += 1;

        if *errors >= self.max_consecutive_errors {
            let mut is_open = self.is_open.write().await;
            *self.last_error_time.write().await = Some(Instant::now());
            if !*is_open {
                *is_open = true;
                error!("Circuit breaker OPEN after {} consecutive errors", *errors);
                return true;
            }
        }
        false
    }

    pub async fn can_proceed(&self) -> bool {
        let is_open = *self.is_open.read().await;
        if !is_open {
            return true;
        }

        let last_error_time = *self.last_error_time.read().await;
        if let Some(last_error) = last_error_time {
            if last_error.elapsed() > self.cooldown_duration {
                info!("Circuit breaker cooldown complete, resetting");
                *self.is_open.write().await = false;
                *self.consecutive_errors.write().await = 0;
                return true;
            }
        }
        false
    }

    pub async fn is_open(&self) -> bool {
        *self.is_open.read().await
    }

    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        if !self.is_open().await {
            return None;
        }
        let last_error_time = *self.last_error_time.read().await;
        last_error_time.map(|t| self.cooldown_duration.saturating_sub(t.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(!breaker.record_error().await);
        assert!(!breaker.record_error().await);
        assert!(breaker.record_error().await);
        assert!(!breaker.can_proceed().await);
        // Further errors while open do not re-trip
        assert!(!breaker.record_error().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_error().await;
        breaker.record_success().await;
        assert!(!breaker.record_error().await);
        assert!(breaker.can_proceed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
        assert!(breaker.record_error().await);
        assert!(!breaker.can_proceed().await);
        assert!(breaker.cooldown_remaining().await.is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(breaker.can_proceed().await);
        assert!(!breaker.is_open().await);
        assert_eq!(*breaker.consecutive_errors.read().await, 0);
    }
}
