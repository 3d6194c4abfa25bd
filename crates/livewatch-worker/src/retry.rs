//! Uniform retry wrapper around adapter calls.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::time::{Instant, sleep, timeout_at};

use livewatch_core::config::RetryConfig;
use livewatch_core::traits::AdapterError;

/// Exponential backoff applied by the scheduler to every adapter call.
///
/// Only retryable errors are retried, and no attempt starts or runs past the
/// cycle deadline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    min_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Build a policy from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms)),
            jitter: config.jitter,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    fn delays(&self) -> impl Iterator<Item = Duration> + Send + use<> {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1));
        let builder = if self.jitter {
            builder.with_jitter()
        } else {
            builder
        };
        std::iter::once(Duration::ZERO).chain(builder.build())
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts,
    /// or hits `deadline`. Hitting the deadline yields
    /// [`AdapterError::Timeout`].
    pub async fn run<T, F, Fut>(&self, deadline: Instant, mut op: F) -> Result<T, AdapterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let mut last_err = AdapterError::Timeout;
        let mut retry_after = Duration::ZERO;

        for (attempt, delay) in self.delays().enumerate() {
            let delay = delay.max(retry_after);
            if !delay.is_zero() {
                let resume = Instant::now().checked_add(delay);
                if resume.is_none_or(|at| at >= deadline) {
                    tracing::debug!(attempt, "Retry would exceed cycle deadline, giving up");
                    return Err(last_err);
                }
                sleep(delay).await;
            }

            match timeout_at(deadline, op()).await {
                Err(_) => return Err(AdapterError::Timeout),
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_retryable() => {
                    tracing::debug!(attempt = attempt + 1, "Retryable adapter error: {}", e);
                    retry_after = match &e {
                        AdapterError::RateLimited {
                            retry_after_secs: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => Duration::ZERO,
                    };
                    last_err = e;
                }
                Ok(Err(e)) => return Err(e),
            }
        }

        Err(last_err)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
