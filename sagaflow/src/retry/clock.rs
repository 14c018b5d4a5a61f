//! Delay primitive used between retry attempts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Waits for a duration.
///
/// Injected into [`RetryPolicy`](super::RetryPolicy) so tests can observe
/// backoff without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates a new recording sleeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested delay, in order.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    /// Returns the requested delays in milliseconds.
    #[must_use]
    pub fn delays_ms(&self) -> Vec<u128> {
        self.delays.lock().iter().map(Duration::as_millis).collect()
    }

    /// Returns the sum of all requested delays.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.delays.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}
