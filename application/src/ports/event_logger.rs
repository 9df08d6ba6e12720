//! Port for structured run event logging.
//!
//! Defines the [`EventLogger`] trait for recording run events (task
//! transitions, dead letters, council rounds, session state changes) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable history of the run (JSONL).

use serde_json::Value;

/// A structured run event.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields. The adapter adds the timestamp.
pub struct RunEvent {
    /// Event type identifier (e.g., "task_completed", "council_round").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RunEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging run events to a structured log.
///
/// The `log` method is synchronous and non-fallible: logging failures are
/// ignored and never disrupt the run.
pub trait EventLogger: Send + Sync {
    fn log(&self, event: RunEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoEventLogger;

impl EventLogger for NoEventLogger {
    fn log(&self, _event: RunEvent) {}
}
