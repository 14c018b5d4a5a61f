//! Bounded retry around a single fallible async operation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::clock::{Sleeper, TokioSleeper};
use super::config::{backoff_delay, BackoffStrategy, RetryConfig};
use crate::reporting::{ErrorReporter, TracingErrorReporter};

/// Retries an operation with backoff and reports terminal failures.
///
/// Cloning is cheap; clones share the sleeper and reporter.
///
/// Delays are kept as exact [`Duration`]s. The millisecond fields of
/// [`RetryConfig`] only seed them in [`from_config`](Self::from_config).
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    base_delay: Duration,
    max_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    reporter: Arc<dyn ErrorReporter>,
}

impl RetryPolicy {
    /// Builds a policy from a config, sleeping on tokio and reporting
    /// through `tracing`.
    #[must_use]
    pub fn from_config(config: RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            config,
            sleeper: Arc::new(TokioSleeper),
            reporter: Arc::new(TracingErrorReporter),
        }
    }

    /// Linear backoff: waits `base_delay * n` after failed attempt `n`.
    #[must_use]
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self::from_config(
            RetryConfig::new()
                .with_max_attempts(max_attempts)
                .with_backoff(BackoffStrategy::Linear),
        )
        .with_delays(base_delay, Duration::MAX)
    }

    /// Capped exponential backoff: waits `min(base_delay * 2^(n-1), max_delay)`.
    #[must_use]
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self::from_config(
            RetryConfig::new()
                .with_max_attempts(max_attempts)
                .with_backoff(BackoffStrategy::Exponential),
        )
        .with_delays(base_delay, max_delay)
    }

    /// Replaces the base delay and the delay cap.
    ///
    /// The config's millisecond fields are updated, rounded down; the policy
    /// itself waits the exact durations.
    #[must_use]
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.config.base_delay_ms = duration_ms(base_delay);
        self.config.max_delay_ms = duration_ms(max_delay);
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Replaces the delay primitive.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the error reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the context label passed to the reporter.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Returns the underlying config.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay after failed attempt `attempt` (1-based), jitter applied.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = backoff_delay(self.config.backoff, self.base_delay, self.max_delay, attempt);
        self.config.jitter.apply(delay)
    }

    /// Runs `operation`, retrying every failure until attempts run out.
    ///
    /// Returns the last error once the budget is exhausted.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_with(operation, |_| false).await
    }

    /// Runs `operation`, propagating immediately any error for which
    /// `is_non_retryable` returns true.
    ///
    /// Every terminal failure (non-retryable or last attempt) is reported
    /// once before being returned. Intermediate failures are only logged.
    pub async fn execute_with<T, E, F, Fut, P>(
        &self,
        mut operation: F,
        is_non_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.config.attempts();
        let label = self.config.label.as_str();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if is_non_retryable(&error) {
                debug!(label, attempt, error = %error, "Non-retryable error");
                self.reporter.report(&error, label);
                return Err(error);
            }

            if attempt >= max_attempts {
                debug!(label, attempt, max_attempts, error = %error, "Retries exhausted");
                self.reporter.report(&error, label);
                return Err(error);
            }

            let delay = self.delay_for_attempt(attempt);
            debug!(
                label,
                attempt,
                max_attempts,
                delay_ms = delay.as_secs_f64() * 1000.0,
                error = %error,
                "Retrying after error"
            );
            drop(error);
            self.sleeper.sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(RetryConfig::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

/// Runs `operation` with linear backoff on tokio, reporting through `tracing`.
pub async fn with_retry<T, E, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryPolicy::linear(max_attempts, base_delay)
        .execute(operation)
        .await
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
