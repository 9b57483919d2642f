//! Relay session state shared between the streaming and command paths.

use relay_domain::RequestId;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;

/// One in-flight relayed request.
///
/// The abort handle lives as long as the session and is reused by every
/// retry, so a cancel aimed at the first attempt still reaches later ones.
/// `cancelled` is monotonic: once set it never reverts.
#[derive(Debug)]
pub struct RelaySession {
    id: RequestId,
    abort: CancellationToken,
    cancelled: AtomicBool,
    retry_count: AtomicU32,
}

impl RelaySession {
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            abort: CancellationToken::new(),
            cancelled: AtomicBool::new(false),
            retry_count: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn abort_handle(&self) -> &CancellationToken {
        &self.abort
    }

    /// Mark the session cancelled and abort its upstream stream.
    ///
    /// Returns `true` only for the call that actually performed the cancel.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        self.abort.cancel();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Retries performed so far (0 during the first attempt).
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    /// Record the start of another retry and return the new count.
    pub fn begin_retry(&self) -> u32 {
        self.retry_count.fetch_add(1, Ordering::SeqCst) + 1
    }
}
