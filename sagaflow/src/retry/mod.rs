//! Retry utilities with configurable backoff and jitter strategies.
//!
//! Wraps a single fallible async operation with bounded retries. Saga steps
//! are free to use a [`RetryPolicy`] inside their operation; once retries are
//! exhausted the saga sees an ordinary step failure.

mod clock;
mod config;
mod policy;

pub use clock::{RecordingSleeper, Sleeper, TokioSleeper};
pub use config::{BackoffStrategy, JitterStrategy, RetryConfig};
pub use policy::{with_retry, RetryPolicy};
