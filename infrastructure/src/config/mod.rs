//! Configuration file loading for stream-relay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `STREAM_RELAY_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./relay.toml` or `./.relay.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/stream-relay/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBackpressureConfig, FileConfig, FileControlConfig, FileHostConfig,
    FileLoggingConfig, FileUpstreamConfig,
};
pub use loader::ConfigLoader;
