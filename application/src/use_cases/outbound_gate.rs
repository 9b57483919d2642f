//! Outbound gate: backpressure and background batching for one session.
//!
//! Two independent axes control how fragments reach the Coordinator:
//!
//! - **Host visibility**: while backgrounded, fragments are coalesced into a
//!   single batch flushed after a short debounce. Returning to the foreground
//!   (or ending the stream) flushes the batch before any new fragment.
//! - **Queue depth**: after every send the link's queue depth is checked.
//!   Above the soft threshold the task yields; above the hard threshold it
//!   pauses before the next chunk is processed.
//!
//! Nothing passes the gate once the session is cancelled.

use super::relay_session::RelaySession;
use crate::config::BackpressureParams;
use crate::ports::coordinator::CoordinatorLink;
use relay_domain::{HostVisibility, RelayOutput};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

pub struct OutboundGate {
    session: Arc<RelaySession>,
    link: Arc<dyn CoordinatorLink>,
    visibility: watch::Receiver<HostVisibility>,
    params: BackpressureParams,
    pending: Vec<String>,
    flush_deadline: Option<Instant>,
}

impl OutboundGate {
    pub fn new(
        session: Arc<RelaySession>,
        link: Arc<dyn CoordinatorLink>,
        visibility: watch::Receiver<HostVisibility>,
        params: BackpressureParams,
    ) -> Self {
        Self {
            session,
            link,
            visibility,
            params,
            pending: Vec::new(),
            flush_deadline: None,
        }
    }

    fn is_backgrounded(&self) -> bool {
        self.visibility.borrow().is_background()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pass one stream fragment towards the Coordinator.
    pub async fn forward(&mut self, fragment: String) {
        if self.session.is_cancelled() {
            self.pending.clear();
            return;
        }

        if self.is_backgrounded() {
            if self.pending.is_empty() {
                self.flush_deadline = Some(Instant::now() + self.params.batch_debounce);
            }
            self.pending.push(fragment);
            return;
        }

        self.flush().await;
        self.send(RelayOutput::Content(fragment)).await;
    }

    /// Send a control output (error, retry notice, sentinel) after any
    /// pending fragments.
    pub async fn emit(&mut self, output: RelayOutput) {
        self.flush().await;
        if self.session.is_cancelled() {
            return;
        }
        self.send(output).await;
    }

    /// Send the pending batch, in arrival order, as a single output.
    pub async fn flush(&mut self) {
        self.flush_deadline = None;
        if self.pending.is_empty() {
            return;
        }
        if self.session.is_cancelled() {
            self.pending.clear();
            return;
        }

        let batch: String = self.pending.drain(..).collect();
        trace!(
            "Gate {}: flushing batch of {} bytes",
            self.session.id().short(),
            batch.len()
        );
        self.send(RelayOutput::Content(batch)).await;
    }

    /// Resolves when the pending batch should be flushed: the debounce
    /// window elapsed or the host came back to the foreground.
    ///
    /// Never resolves while nothing is pending. Cancel safe.
    pub async fn flush_due(&mut self) {
        let Some(deadline) = self.flush_deadline else {
            return std::future::pending().await;
        };

        loop {
            if !self.is_backgrounded() {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                changed = self.visibility.changed() => {
                    if changed.is_err() {
                        // Visibility source is gone; fall back to the debounce
                        tokio::time::sleep_until(deadline).await;
                        return;
                    }
                }
            }
        }
    }

    async fn send(&mut self, output: RelayOutput) {
        self.link.send(self.session.id(), output);

        let depth = self.link.queue_depth();
        if depth > self.params.hard_queue_depth {
            trace!(
                "Gate {}: queue depth {} above hard limit, pausing",
                self.session.id().short(),
                depth
            );
            tokio::time::sleep(self.params.hard_pause).await;
        } else if depth > self.params.soft_queue_depth {
            tokio::task::yield_now().await;
        }
    }
}
