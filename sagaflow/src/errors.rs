//! Error types for the sagaflow executor.
//!
//! Failures are tagged by kind so callers and telemetry consumers can match
//! on [`ErrorKind`] instead of inspecting message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The error type for saga operations, compensations and retries.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Transient failure of a single attempt; worth retrying.
    #[error("retryable: {0}")]
    Retryable(#[source] anyhow::Error),

    /// Failure that will not succeed on retry.
    #[error("terminal: {0}")]
    Terminal(#[source] anyhow::Error),

    /// A compensation failed while rolling back a completed step.
    #[error("compensation for step '{step}' (index {index}) failed: {source}")]
    CompensationFailed {
        /// Name of the step whose compensation failed.
        step: String,
        /// Position of the step in the saga.
        index: usize,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// Construction-time validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SagaError {
    /// Creates a retryable error.
    pub fn retryable(err: impl Into<anyhow::Error>) -> Self {
        Self::Retryable(err.into())
    }

    /// Creates a terminal error.
    pub fn terminal(err: impl Into<anyhow::Error>) -> Self {
        Self::Terminal(err.into())
    }

    /// Creates a retryable error from a message.
    pub fn retryable_msg(message: impl fmt::Display) -> Self {
        Self::Retryable(anyhow::anyhow!("{message}"))
    }

    /// Creates a terminal error from a message.
    pub fn terminal_msg(message: impl fmt::Display) -> Self {
        Self::Terminal(anyhow::anyhow!("{message}"))
    }

    /// Creates a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Wraps an error raised by a compensation.
    pub fn compensation_failed(
        step: impl Into<String>,
        index: usize,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::CompensationFailed {
            step: step.into(),
            index,
            source: source.into(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Retryable(_) => ErrorKind::Retryable,
            Self::Terminal(_) => ErrorKind::Terminal,
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Returns true if retrying cannot help.
    ///
    /// Suitable as the non-retryable predicate of
    /// [`RetryPolicy::execute_with`](crate::retry::RetryPolicy::execute_with).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<anyhow::Error> for SagaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Terminal(err)
    }
}

/// Discriminant of [`SagaError`], used in event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`SagaError::Retryable`].
    Retryable,
    /// See [`SagaError::Terminal`].
    Terminal,
    /// See [`SagaError::CompensationFailed`].
    CompensationFailed,
    /// See [`SagaError::InvalidConfig`].
    InvalidConfig,
}

impl ErrorKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retryable => "retryable",
            Self::Terminal => "terminal",
            Self::CompensationFailed => "compensation_failed",
            Self::InvalidConfig => "invalid_config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_classification() {
        assert_eq!(SagaError::retryable_msg("x").kind(), ErrorKind::Retryable);
        assert_eq!(SagaError::terminal_msg("x").kind(), ErrorKind::Terminal);
        assert_eq!(
            SagaError::compensation_failed("s", 0, anyhow::anyhow!("x")).kind(),
            ErrorKind::CompensationFailed
        );
        assert_eq!(SagaError::invalid_config("x").kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_only_retryable_is_not_terminal() {
        assert!(SagaError::retryable_msg("timeout").is_retryable());
        assert!(!SagaError::retryable_msg("timeout").is_terminal());
        assert!(SagaError::terminal_msg("bad input").is_terminal());
        assert!(SagaError::invalid_config("zero").is_terminal());
    }

    #[test]
    fn test_anyhow_converts_to_terminal() {
        let err: SagaError = anyhow::anyhow!("constraint violated").into();
        assert!(matches!(err, SagaError::Terminal(_)));
    }

    #[test]
    fn test_display_and_source() {
        let err = SagaError::compensation_failed("create_org", 1, anyhow::anyhow!("row locked"));
        assert_eq!(
            err.to_string(),
            "compensation for step 'create_org' (index 1) failed: row locked"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(ErrorKind::CompensationFailed).unwrap();
        assert_eq!(json, serde_json::json!("compensation_failed"));
        assert_eq!(ErrorKind::Retryable.to_string(), "retryable");
    }
}
