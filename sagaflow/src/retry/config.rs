//! Retry configuration with backoff and jitter strategies.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::SagaError;

/// Backoff strategy for retry delays.
///
/// `n` below is the 1-based number of the attempt that just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * n
    #[default]
    Linear,
    /// delay = base * 2^(n-1), capped at `max_delay_ms`
    Exponential,
    /// delay = base
    Constant,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => {
                if nanos == 0 {
                    delay
                } else {
                    Duration::from_nanos(rand::thread_rng().gen_range(0..=nanos))
                }
            }
            Self::Equal => {
                let half = nanos / 2;
                if half == 0 {
                    delay
                } else {
                    Duration::from_nanos(half + rand::thread_rng().gen_range(0..=half))
                }
            }
        }
    }
}

/// Delay after failed attempt `attempt` (1-based) for `base` and `max`.
pub(crate) fn backoff_delay(
    strategy: BackoffStrategy,
    base: Duration,
    max: Duration,
    attempt: u32,
) -> Duration {
    let attempt = attempt.max(1);
    let delay = match strategy {
        BackoffStrategy::Linear => base.saturating_mul(attempt),
        BackoffStrategy::Exponential => base.saturating_mul(2u32.saturating_pow(attempt - 1)),
        BackoffStrategy::Constant => base,
    };
    delay.min(max)
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    /// Context label handed to the error reporter on terminal failure.
    pub label: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff: BackoffStrategy::Linear,
            jitter: JitterStrategy::None,
            label: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SagaError> {
        serde_json::from_str(json)
            .map_err(|e| SagaError::invalid_config(format!("retry config: {e}")))
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub const fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Sets the reporting label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Effective attempt budget.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based), before jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        backoff_delay(
            self.backoff,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            attempt,
        )
    }
}
