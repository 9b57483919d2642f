//! Logging infrastructure: structured relay event logging.
//!
//! Provides [`JsonlRelayEventLogger`], a JSONL file writer that implements
//! the [`RelayEventLogger`](relay_application::RelayEventLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlRelayEventLogger;
