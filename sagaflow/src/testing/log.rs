//! Shared, cloneable call log.

use parking_lot::Mutex;
use std::sync::Arc;

/// Records labelled calls in the order they happen.
///
/// Clones share the same log, so one can be moved into each operation and
/// compensation closure.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns entries starting with `prefix`.
    #[must_use]
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
