//! `tracing-subscriber` installation for binaries and tests embedding sagaflow.

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds a fmt subscriber, filtering with `RUST_LOG` when set and
/// `default_filter` otherwise.
///
/// Nothing is installed; pair with [`tracing::subscriber::with_default`] for
/// a scoped subscriber.
pub fn build_subscriber(
    default_filter: &str,
    json: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, BoxError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if json {
        Ok(Box::new(builder.json().finish()))
    } else {
        Ok(Box::new(builder.finish()))
    }
}

/// Installs [`build_subscriber`] as the global subscriber.
///
/// Returns an error if a global subscriber is already installed.
pub fn try_init_tracing(default_filter: &str, json: bool) -> Result<(), BoxError> {
    tracing::subscriber::set_global_default(build_subscriber(default_filter, json)?)?;
    Ok(())
}

/// Like [`try_init_tracing`], ignoring an already-installed subscriber.
pub fn init_tracing(default_filter: &str, json: bool) {
    if let Err(err) = try_init_tracing(default_filter, json) {
        tracing::debug!(error = %err, "Tracing subscriber not installed");
    }
}
