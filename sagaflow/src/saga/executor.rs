//! Sequential saga execution with reverse-order rollback.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::result::RunResult;
use super::step::{BoxedCompensation, Step};
use crate::errors::SagaError;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::utils::{generate_uuid, iso_timestamp};

/// One logical unit of work: ordered steps run once, rolled back on failure.
///
/// Steps run strictly one after another in registration order. When an
/// operation fails, the compensations of the steps that had already
/// completed run in reverse order; the failing step is never compensated.
/// A compensation failure is logged and emitted but never stops the
/// remaining compensations, and never replaces the original error.
///
/// `run` consumes the saga, so a saga cannot be run twice.
///
/// Every step yields the same `T`. When steps produce different values, use
/// an enum as `T`:
///
/// ```
/// use sagaflow::saga::Saga;
///
/// enum Onboarded {
///     Org(u64),
///     Profile(String),
/// }
///
/// let mut saga: Saga<Onboarded> = Saga::new();
/// saga.add_named_step("create_org", || async { Ok(Onboarded::Org(7)) }, || async { Ok(()) })
///     .add_named_step(
///         "create_profile",
///         || async { Ok(Onboarded::Profile("ada".to_string())) },
///         || async { Ok(()) },
///     );
/// assert_eq!(saga.step_names(), vec!["create_org", "create_profile"]);
/// ```
pub struct Saga<T> {
    id: Uuid,
    steps: Vec<Step<T>>,
    sink: Arc<dyn EventSink>,
}

impl<T: Send + 'static> Saga<T> {
    /// Creates an empty saga with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: generate_uuid(),
            steps: Vec::new(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Appends a step named `step-<index>`.
    pub fn add_step<F, Fut, C, CFut>(&mut self, operation: F, compensation: C) -> &mut Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SagaError>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), SagaError>> + Send + 'static,
    {
        let name = format!("step-{}", self.steps.len());
        self.push(Step::new(name, operation, compensation))
    }

    /// Appends a named step.
    pub fn add_named_step<F, Fut, C, CFut>(
        &mut self,
        name: impl Into<String>,
        operation: F,
        compensation: C,
    ) -> &mut Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SagaError>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), SagaError>> + Send + 'static,
    {
        self.push(Step::new(name, operation, compensation))
    }

    /// Appends a prepared step.
    pub fn push(&mut self, step: Step<T>) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Runs every step in order, rolling back on the first failure.
    pub async fn run(self) -> RunResult<T> {
        let span = tracing::info_span!("saga", saga_id = %self.id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> RunResult<T> {
        let Self { id, steps, sink } = self;
        let total = steps.len();

        info!(steps = total, "Saga started");
        sink.emit(
            names::SAGA_STARTED,
            Some(serde_json::json!({
                "saga_id": id.to_string(),
                "steps": total,
                "timestamp": iso_timestamp(),
            })),
        )
        .await;

        let mut results: Vec<T> = Vec::with_capacity(total);
        let mut compensations: Vec<(String, BoxedCompensation<T>)> = Vec::with_capacity(total);

        for (index, step) in steps.into_iter().enumerate() {
            let (name, operation, compensation) = step.into_parts();
            let timer = SpanTimer::start();

            match operation().await {
                Ok(output) => {
                    let duration_ms = timer.finish();
                    debug!(step = %name, index, duration_ms, "Step completed");
                    sink.emit(
                        names::STEP_COMPLETED,
                        Some(serde_json::json!({
                            "saga_id": id.to_string(),
                            "step": name,
                            "index": index,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
                    results.push(output);
                    compensations.push((name, compensation));
                }
                Err(error) => {
                    let duration_ms = timer.finish();
                    let completed = results.len();
                    warn!(
                        step = %name,
                        index,
                        completed,
                        error = %error,
                        "Step failed, rolling back"
                    );
                    sink.emit(
                        names::STEP_FAILED,
                        Some(serde_json::json!({
                            "saga_id": id.to_string(),
                            "step": name,
                            "index": index,
                            "duration_ms": duration_ms,
                            "error_kind": error.kind(),
                            "error": error.to_string(),
                        })),
                    )
                    .await;

                    let failures = rollback(id, sink.as_ref(), compensations, results).await;
                    info!(completed, compensation_failures = failures, "Saga rolled back");
                    sink.emit(
                        names::SAGA_ROLLED_BACK,
                        Some(serde_json::json!({
                            "saga_id": id.to_string(),
                            "failed_step": name,
                            "completed": completed,
                            "compensation_failures": failures,
                            "timestamp": iso_timestamp(),
                        })),
                    )
                    .await;

                    return RunResult::failed_with(id, completed, name, index, error);
                }
            }
        }

        info!(steps = total, "Saga completed");
        sink.emit(
            names::SAGA_COMPLETED,
            Some(serde_json::json!({
                "saga_id": id.to_string(),
                "steps": total,
                "timestamp": iso_timestamp(),
            })),
        )
        .await;

        RunResult::succeeded_with(id, results)
    }
}

/// Runs compensations for the completed steps, last first.
///
/// Returns the number of compensations that failed.
async fn rollback<T>(
    id: Uuid,
    sink: &dyn EventSink,
    compensations: Vec<(String, BoxedCompensation<T>)>,
    outputs: Vec<T>,
) -> usize {
    let mut failures = 0;

    for (index, ((name, compensation), output)) in
        compensations.into_iter().zip(outputs).enumerate().rev()
    {
        let timer = SpanTimer::start();

        match compensation(output).await {
            Ok(()) => {
                let duration_ms = timer.finish();
                debug!(step = %name, index, duration_ms, "Compensation completed");
                sink.emit(
                    names::COMPENSATION_COMPLETED,
                    Some(serde_json::json!({
                        "saga_id": id.to_string(),
                        "step": name,
                        "index": index,
                        "duration_ms": duration_ms,
                    })),
                )
                .await;
            }
            Err(source) => {
                failures += 1;
                let error = SagaError::compensation_failed(name.as_str(), index, source);
                warn!(step = %name, index, error = %error, "Compensation failed, continuing rollback");
                sink.emit(
                    names::COMPENSATION_FAILED,
                    Some(serde_json::json!({
                        "saga_id": id.to_string(),
                        "step": name,
                        "index": index,
                        "error_kind": error.kind(),
                        "error": error.to_string(),
                    })),
                )
                .await;
            }
        }
    }

    failures
}

impl<T: Send + 'static> Default for Saga<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Saga<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saga")
            .field("id", &self.id)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
