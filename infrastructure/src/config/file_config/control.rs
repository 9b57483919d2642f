//! `[control]` section

use serde::{Deserialize, Serialize};

/// Coordinator connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileControlConfig {
    /// WebSocket URL of the Coordinator.
    pub url: String,
    /// Delay between reconnection attempts.
    pub reconnect_delay_secs: u64,
}

impl Default for FileControlConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5102/ws".to_string(),
            reconnect_delay_secs: 5,
        }
    }
}
