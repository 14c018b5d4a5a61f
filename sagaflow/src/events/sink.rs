//! Event sink trait and implementations.

use async_trait::async_trait;
use tracing::{debug, info, warn, Level};

/// Trait for sinks that receive saga lifecycle events.
///
/// Sinks are a side channel: nothing they do can change the outcome of a
/// saga run, so `emit` returns nothing.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "saga.step.completed")
    /// * `data` - Optional event data
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Returns the level events are logged at.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        match self.level {
            Level::TRACE | Level::DEBUG => {
                debug!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
            }
            Level::WARN | Level::ERROR => {
                warn!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
            }
            _ => {
                info!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
            }
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<serde_json::Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit("saga.started", None).await;
        sink.emit("saga.started", Some(serde_json::json!({"x": 1}))).await;
    }

    #[tokio::test]
    async fn test_logging_sink_levels() {
        assert_eq!(LoggingEventSink::default().level(), Level::INFO);
        let sink = LoggingEventSink::debug();
        assert_eq!(sink.level(), Level::DEBUG);
        sink.emit("saga.completed", Some(serde_json::json!({"steps": 3}))).await;
        LoggingEventSink::new(Level::WARN).emit("saga.rolled_back", None).await;
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("saga.started", None).await;
        sink.emit("saga.step.completed", Some(serde_json::json!({"index": 0}))).await;

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["saga.started", "saga.step.completed"]);
    }

    #[tokio::test]
    async fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.emit("saga.step.completed", None).await;
        sink.emit("saga.step.failed", None).await;
        sink.emit("saga.compensation.completed", None).await;

        assert_eq!(sink.events_of_type("saga.step.").len(), 2);
        assert_eq!(sink.events_of_type("saga.compensation.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
