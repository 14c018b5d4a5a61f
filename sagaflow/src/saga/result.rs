//! Outcome of a saga run.

use uuid::Uuid;

use crate::errors::SagaError;

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome<T> {
    /// Every step succeeded; one result per step, in step order.
    Succeeded {
        /// Operation results.
        results: Vec<T>,
    },
    /// A step failed and the completed steps were rolled back.
    Failed {
        /// Name of the failing step.
        step: String,
        /// Position of the failing step.
        index: usize,
        /// The error raised by the failing step's operation.
        error: SagaError,
    },
}

/// Result of [`Saga::run`](super::Saga::run).
///
/// Compensation failures never appear here; they are logged and emitted as
/// events only.
#[derive(Debug)]
pub struct RunResult<T> {
    /// Correlation id of the saga that produced this result.
    pub saga_id: Uuid,
    /// Steps that completed. Equals the step count on success.
    pub completed_count: usize,
    /// Success or failure details.
    pub outcome: RunOutcome<T>,
}

impl<T> RunResult<T> {
    pub(crate) fn succeeded_with(saga_id: Uuid, results: Vec<T>) -> Self {
        Self {
            saga_id,
            completed_count: results.len(),
            outcome: RunOutcome::Succeeded { results },
        }
    }

    pub(crate) fn failed_with(
        saga_id: Uuid,
        completed_count: usize,
        step: String,
        index: usize,
        error: SagaError,
    ) -> Self {
        Self {
            saga_id,
            completed_count,
            outcome: RunOutcome::Failed { step, index, error },
        }
    }

    /// Returns true if every step succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Succeeded { .. })
    }

    /// Returns the per-step results on success.
    #[must_use]
    pub fn results(&self) -> Option<&[T]> {
        match &self.outcome {
            RunOutcome::Succeeded { results } => Some(results),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// Returns the triggering error on failure.
    #[must_use]
    pub fn error(&self) -> Option<&SagaError> {
        match &self.outcome {
            RunOutcome::Succeeded { .. } => None,
            RunOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// Returns the name of the failing step on failure.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Succeeded { .. } => None,
            RunOutcome::Failed { step, .. } => Some(step),
        }
    }

    /// Converts into a plain `Result`.
    pub fn into_result(self) -> Result<Vec<T>, SagaError> {
        match self.outcome {
            RunOutcome::Succeeded { results } => Ok(results),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_accessors() {
        let id = Uuid::new_v4();
        let result = RunResult::succeeded_with(id, vec!["a", "b"]);

        assert!(result.succeeded());
        assert_eq!(result.saga_id, id);
        assert_eq!(result.completed_count, 2);
        assert_eq!(result.results(), Some(&["a", "b"][..]));
        assert!(result.error().is_none());
        assert!(result.failed_step().is_none());
        assert_eq!(result.into_result().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_failure_accessors() {
        let result: RunResult<u8> = RunResult::failed_with(
            Uuid::new_v4(),
            1,
            "assign_role".to_string(),
            1,
            SagaError::terminal_msg("forbidden"),
        );

        assert!(!result.succeeded());
        assert_eq!(result.completed_count, 1);
        assert!(result.results().is_none());
        assert_eq!(result.failed_step(), Some("assign_role"));
        assert_eq!(result.error().unwrap().to_string(), "terminal: forbidden");
        assert!(matches!(result.into_result(), Err(SagaError::Terminal(_))));
    }
}
