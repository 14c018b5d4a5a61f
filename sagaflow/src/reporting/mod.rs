//! Error reporting collaborators.
//!
//! A [`RetryPolicy`](crate::retry::RetryPolicy) hands every terminal failure
//! to exactly one [`ErrorReporter`]. Reporters are injected at construction.

use parking_lot::RwLock;
use std::fmt;

/// Sink for terminal failures.
pub trait ErrorReporter: Send + Sync {
    /// Reports a failure together with a context label.
    fn report(&self, error: &dyn fmt::Display, context: &str);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpErrorReporter;

impl ErrorReporter for NoOpErrorReporter {
    fn report(&self, _error: &dyn fmt::Display, _context: &str) {}
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &dyn fmt::Display, context: &str) {
        tracing::error!(context, error = %error, "Terminal failure");
    }
}

/// A single collected report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Rendered error message.
    pub message: String,
    /// Context label supplied by the caller.
    pub context: String,
}

/// Collects reports in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingErrorReporter {
    reports: RwLock<Vec<Report>>,
}

impl CollectingErrorReporter {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected reports.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.read().clone()
    }

    /// Returns the number of collected reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    /// Returns true if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

impl ErrorReporter for CollectingErrorReporter {
    fn report(&self, error: &dyn fmt::Display, context: &str) {
        self.reports.write().push(Report {
            message: error.to_string(),
            context: context.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_records_message_and_context() {
        let reporter = CollectingErrorReporter::new();
        assert!(reporter.is_empty());

        reporter.report(&"connection reset", "insert_org");

        assert_eq!(reporter.len(), 1);
        assert_eq!(
            reporter.reports()[0],
            Report {
                message: "connection reset".to_string(),
                context: "insert_org".to_string(),
            }
        );
    }

    #[test]
    fn test_noop_and_tracing_reporters() {
        NoOpErrorReporter.report(&"ignored", "ctx");
        TracingErrorReporter.report(&"logged", "ctx");
    }
}
