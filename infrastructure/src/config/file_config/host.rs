//! `[host]` and `[logging]` sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHostConfig {
    /// Start in the background state (fragments batched).
    pub start_backgrounded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for a daily rolling diagnostic log file.
    pub dir: Option<PathBuf>,
    /// JSONL file receiving relay lifecycle events.
    pub events_file: Option<PathBuf>,
}
