//! Bounded retry with exponential backoff

use crate::config::ScrapeConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// The aggregated failure of a retried operation
///
/// Individual causes are logged as they happen and are not carried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("All {attempts} retries failed")]
    Exhausted { attempts: u32 },
}

/// Retries an operation up to `attempts` times
///
/// After failed attempt `n` (counting from 0) the policy waits
/// `base * 2^n`, clamped to `max_delay` when one is set. No wait follows the
/// final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base: Duration,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Creates an uncapped policy; `attempts` is raised to at least 1
    pub fn new(attempts: u32, base: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        let policy = Self::new(
            config.retry_attempts,
            Duration::from_millis(config.backoff_base_ms),
        );
        match config.max_backoff_ms {
            0 => policy,
            cap => policy.with_max_delay(Duration::from_millis(cap)),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait after failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base.saturating_mul(2u32.saturating_pow(attempt));
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Runs `operation` until it succeeds or the attempts are used up
    ///
    /// `label` identifies the operation in log lines.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        for attempt in 0..self.attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        operation = label,
                        attempt = attempt + 1,
                        max_attempts = self.attempts,
                        "Attempt failed: {}",
                        e
                    );
                    if attempt + 1 < self.attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.attempts,
        })
    }
}
