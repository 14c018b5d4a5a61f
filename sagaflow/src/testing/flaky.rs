//! Operation that fails a fixed number of times before succeeding.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::SagaError;

/// A retry test double.
///
/// Each call to [`call`](Self::call) counts; the first `failures` calls fail
/// and later calls return the 1-based call number.
#[derive(Debug)]
pub struct FlakyOperation {
    failures: usize,
    terminal: bool,
    calls: AtomicUsize,
}

impl FlakyOperation {
    /// Fails the first `failures` calls with a retryable error.
    #[must_use]
    pub const fn new(failures: usize) -> Self {
        Self {
            failures,
            terminal: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never succeeds.
    #[must_use]
    pub const fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    /// Makes the injected failures terminal instead of retryable.
    #[must_use]
    pub const fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Performs one attempt.
    pub async fn call(&self) -> Result<usize, SagaError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            let message = format!("attempt {call} failed");
            return Err(if self.terminal {
                SagaError::terminal_msg(message)
            } else {
                SagaError::retryable_msg(message)
            });
        }
        Ok(call)
    }
}
