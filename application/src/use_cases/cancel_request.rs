//! Cancel Request use case.
//!
//! The only writer of a session's `cancelled` flag for Coordinator-issued
//! cancels. Idempotent: cancelling an unknown or already cancelled id is a
//! no-op, since a cancel can race the session's natural completion.

use super::session_registry::SessionRegistry;
use relay_domain::RequestId;
use std::sync::Arc;
use tracing::{debug, info};

/// What a cancel command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelled,
    NotFound,
}

#[derive(Clone)]
pub struct CancelRequestUseCase {
    registry: Arc<SessionRegistry>,
}

impl CancelRequestUseCase {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(&self, request_id: &RequestId) -> CancelOutcome {
        let Some(session) = self.registry.get(request_id) else {
            debug!("Cancel {}: no live session", request_id);
            return CancelOutcome::NotFound;
        };

        if session.cancel() {
            info!("Cancel {}: session cancelled", request_id);
            CancelOutcome::Cancelled
        } else {
            CancelOutcome::AlreadyCancelled
        }
    }
}
