//! Upstream provider port
//!
//! Defines how the relay opens a streaming response from the model provider.

use async_trait::async_trait;
use relay_domain::RelayPayload;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while opening or reading an upstream stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("No data from upstream for {}s", .0.as_secs())]
    IdleTimeout(Duration),

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Upstream rejected the request: {0}")]
    Rejected(String),
}

impl UpstreamError {
    /// Whether the failure is worth retrying under the session's backoff policy.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Connect(_)
            | UpstreamError::IdleTimeout(_)
            | UpstreamError::Interrupted(_) => true,
            UpstreamError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            UpstreamError::Rejected(_) => false,
        }
    }
}

/// Opens provider streams.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Start streaming a response for `payload`.
    async fn open(&self, payload: &RelayPayload) -> Result<Box<dyn UpstreamStream>, UpstreamError>;
}

/// An open provider response body.
///
/// `next_chunk` must be cancel safe: the relay races it against cancellation
/// and buffer flushes, and a dropped call must not lose bytes.
#[async_trait]
pub trait UpstreamStream: Send {
    /// Next raw byte chunk, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, UpstreamError>;
}
