//! Port for structured relay event logging.
//!
//! Defines the [`RelayEventLogger`] trait for recording session lifecycle
//! events (start, attempt verdicts, scheduled retries, final outcome) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures one machine-readable
//! record per event (JSONL).

use serde_json::Value;

/// A structured relay event.
pub struct RelayEvent {
    /// Event type identifier (e.g., "session_started", "retry_scheduled").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RelayEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging relay events.
///
/// `log` is synchronous and non-fallible; logging failures are ignored.
pub trait RelayEventLogger: Send + Sync {
    fn log(&self, event: RelayEvent);
}

/// No-op implementation for tests and when event logging is disabled.
pub struct NoRelayEventLogger;

impl RelayEventLogger for NoRelayEventLogger {
    fn log(&self, _event: RelayEvent) {}
}
