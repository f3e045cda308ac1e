use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// Bounded retry for provider calls. Callers only ever see the final
/// success or the last failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.3)
            .with_max_elapsed_time(None)
            .build()
    }

    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        is_transient: impl Fn(&E) -> bool,
        mut call: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if is_transient(&error) && attempt <= self.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or(self.max_delay);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if attempt > 1 {
                        tracing::error!(operation, attempt, error = %error, "provider call failed after retries");
                    }
                    return Err(error);
                }
            }
        }
    }
}
