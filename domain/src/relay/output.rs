//! Data a relay session sends back to the Coordinator.

use serde::{Deserialize, Serialize};

/// Announcement that a retry is about to happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryNotice {
    /// 1-based number of the retry about to run.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Backoff before the retry, in milliseconds.
    pub delay: u64,
    pub reason: String,
}

/// One unit of output for a session.
///
/// Every session that is not cancelled ends with exactly one
/// [`Done`](RelayOutput::Done).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutput {
    /// Raw provider fragments (one or more stream lines).
    Content(String),
    /// A terminal error description.
    Error(String),
    /// Optional notice sent before a retry.
    RetryNotice(RetryNotice),
    /// The completion sentinel.
    Done,
}

impl RelayOutput {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, RelayOutput::Done)
    }

    pub fn as_content(&self) -> Option<&str> {
        match self {
            RelayOutput::Content(s) => Some(s),
            _ => None,
        }
    }
}
