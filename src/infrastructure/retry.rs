//! Bounded reconnect loop for startup dependencies.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Overall budget across all attempts and sleeps.
    pub deadline: Duration,
    /// Relative jitter applied to each delay, 0.0..=1.0.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            deadline: Duration::from_secs(120),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Delay after failed attempt number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`, then spread by +/- `jitter`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let capped = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(self.max_delay);

        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return capped;
        }

        let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
        capped.mul_f64(factor).min(self.max_delay)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: fmt::Display + fmt::Debug> {
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: E,
    },
    #[error("{operation} did not succeed within {}s: {last_error}", .deadline.as_secs())]
    DeadlineExceeded {
        operation: String,
        deadline: Duration,
        last_error: E,
    },
    #[error("{operation} cancelled")]
    Cancelled { operation: String },
}

/// Runs `attempt_fn` until it succeeds, the attempts or the deadline run out,
/// or `cancel` fires.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: &str,
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    mut attempt_fn: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display + fmt::Debug,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled { operation: operation.to_string() });
            }
            result = attempt_fn() => result,
        };

        let error = match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Connected after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                operation: operation.to_string(),
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.delay_for(attempt);
        if started.elapsed() + delay > policy.deadline {
            return Err(RetryError::DeadlineExceeded {
                operation: operation.to_string(),
                deadline: policy.deadline,
                last_error: error,
            });
        }

        tracing::warn!(
            operation,
            error = %error,
            attempt,
            retries_left = max_attempts - attempt,
            delay_ms = delay.as_millis() as u64,
            "Connection failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled { operation: operation.to_string() });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
