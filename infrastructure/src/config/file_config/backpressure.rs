//! `[backpressure]` section

use relay_application::BackpressureParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackpressureConfig {
    pub soft_queue_depth: usize,
    pub hard_queue_depth: usize,
    pub hard_pause_ms: u64,
    pub batch_debounce_ms: u64,
}

impl Default for FileBackpressureConfig {
    fn default() -> Self {
        Self {
            soft_queue_depth: 64,
            hard_queue_depth: 256,
            hard_pause_ms: 50,
            batch_debounce_ms: 30,
        }
    }
}

impl FileBackpressureConfig {
    pub fn to_params(&self) -> BackpressureParams {
        BackpressureParams {
            soft_queue_depth: self.soft_queue_depth,
            hard_queue_depth: self.hard_queue_depth,
            hard_pause: Duration::from_millis(self.hard_pause_ms),
            batch_debounce: Duration::from_millis(self.batch_debounce_ms),
        }
    }
}
