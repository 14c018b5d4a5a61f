//! Observability utilities.

mod subscriber;
mod timer;

pub use subscriber::{build_subscriber, init_tracing, try_init_tracing};
pub use timer::SpanTimer;
