//! Infrastructure layer for stream-relay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod control;
pub mod host;
pub mod logging;
pub mod upstream;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileBackpressureConfig, FileConfig, FileControlConfig,
    FileHostConfig, FileLoggingConfig, FileUpstreamConfig,
};
pub use control::{ControlChannel, ControlError, ProtocolError};
pub use host::{set_visibility, visibility_channel, watch_signals};
pub use logging::JsonlRelayEventLogger;
pub use upstream::{HttpUpstreamError, HttpUpstreamProvider};
