//! Operation/compensation pairs.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;

use crate::errors::SagaError;

/// A boxed zero-argument operation.
pub type BoxedOperation<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, SagaError>> + Send>;

/// A boxed compensation, handed the output of its own operation.
pub type BoxedCompensation<T> =
    Box<dyn FnOnce(T) -> BoxFuture<'static, Result<(), SagaError>> + Send>;

/// One step of a saga: an operation and the action that undoes it.
///
/// The compensation only ever runs after the operation has succeeded in the
/// same run, and receives that operation's output.
pub struct Step<T> {
    name: String,
    operation: BoxedOperation<T>,
    compensation: BoxedCompensation<T>,
}

impl<T: Send + 'static> Step<T> {
    /// Creates a step whose compensation takes no arguments.
    pub fn new<F, Fut, C, CFut>(name: impl Into<String>, operation: F, compensation: C) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SagaError>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), SagaError>> + Send + 'static,
    {
        Self::with_output(name, operation, move |_output: T| compensation())
    }

    /// Creates a step whose compensation receives the operation's output.
    ///
    /// Use this when the undo needs what the operation produced, such as the
    /// identifiers of inserted rows.
    pub fn with_output<F, Fut, C, CFut>(
        name: impl Into<String>,
        operation: F,
        compensation: C,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SagaError>> + Send + 'static,
        C: FnOnce(T) -> CFut + Send + 'static,
        CFut: Future<Output = Result<(), SagaError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(move || operation().boxed()),
            compensation: Box::new(move |output| compensation(output).boxed()),
        }
    }

    /// Creates a step with nothing to undo.
    pub fn read_only<F, Fut>(name: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SagaError>> + Send + 'static,
    {
        Self::new(name, operation, || async { Ok(()) })
    }
}

impl<T> Step<T> {
    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, BoxedOperation<T>, BoxedCompensation<T>) {
        (self.name, self.operation, self.compensation)
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish_non_exhaustive()
    }
}
