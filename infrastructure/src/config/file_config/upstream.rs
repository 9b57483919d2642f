//! `[upstream]` section

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upstream provider settings.
///
/// `endpoint` may contain a `{session_id}` placeholder, replaced by the
/// payload's routing session on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUpstreamConfig {
    pub endpoint: String,
    /// Extra request headers (e.g. cookies or API keys).
    pub headers: BTreeMap<String, String>,
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated between two chunks of a response.
    pub idle_timeout_secs: u64,
}

impl Default for FileUpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            headers: BTreeMap::new(),
            connect_timeout_secs: 30,
            idle_timeout_secs: 360,
        }
    }
}
