//! Coordinator link port
//!
//! The outbound half of the control channel as seen by relay sessions.

use relay_domain::{RelayOutput, RequestId};

/// Delivers session output to the Coordinator.
///
/// `send` never fails from the caller's point of view: when the channel is
/// not open the output is dropped with a warning. Nothing is queued across a
/// reconnection; sessions caught by a disconnect end through their own paths.
pub trait CoordinatorLink: Send + Sync {
    /// Deliver one output for `request_id`.
    fn send(&self, request_id: &RequestId, output: RelayOutput);

    /// Number of outputs enqueued but not yet written to the transport.
    fn queue_depth(&self) -> usize;
}
