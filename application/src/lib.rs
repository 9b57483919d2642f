//! Application layer for stream-relay
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BackpressureParams, RelayParams};
pub use ports::{
    command_sink::CommandSink,
    coordinator::CoordinatorLink,
    event_logger::{NoRelayEventLogger, RelayEvent, RelayEventLogger},
    upstream::{UpstreamError, UpstreamProvider, UpstreamStream},
};
pub use use_cases::cancel_request::{CancelOutcome, CancelRequestUseCase};
pub use use_cases::outbound_gate::OutboundGate;
pub use use_cases::relay_engine::RelayEngine;
pub use use_cases::relay_session::RelaySession;
pub use use_cases::run_relay::{RunRelayUseCase, SessionOutcome};
pub use use_cases::session_registry::{RegistryError, SessionRegistry};
