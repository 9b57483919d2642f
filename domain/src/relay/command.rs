//! Commands the Coordinator sends over the control channel.

use super::payload::RelayPayload;
use super::retry::RetryOverrides;
use crate::core::request_id::RequestId;

/// A request to stream `payload` upstream under `request_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRequest {
    pub request_id: RequestId,
    pub payload: RelayPayload,
    pub retry: RetryOverrides,
}

/// A decoded control-channel command.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayCommand {
    /// Start relaying a new request.
    ForwardRequest(ForwardRequest),
    /// Abort a live request; no sentinel follows.
    CancelRequest { request_id: RequestId },
    /// Full restart of the relay engine.
    Reload,
    /// One-shot capture mode; not handled by the relay.
    ActivateCapture,
}

impl RelayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RelayCommand::ForwardRequest(_) => "forward-request",
            RelayCommand::CancelRequest { .. } => "cancel-request",
            RelayCommand::Reload => "reload",
            RelayCommand::ActivateCapture => "activate-capture",
        }
    }
}
