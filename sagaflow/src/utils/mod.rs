//! Identifier and timestamp helpers.

use chrono::Utc;
use uuid::Uuid;

/// Generates a new UUID v4, used as a saga correlation id.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// # Examples
///
/// ```
/// use sagaflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
