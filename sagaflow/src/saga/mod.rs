//! Saga execution: ordered steps with reverse-order compensation.
//!
//! A [`Saga`] is built by registering [`Step`]s, then consumed by
//! [`Saga::run`], which yields a [`RunResult`].

mod executor;
mod result;
mod step;
mod integration_tests;

pub use executor::Saga;
pub use result::{RunOutcome, RunResult};
pub use step::{BoxedCompensation, BoxedOperation, Step};
