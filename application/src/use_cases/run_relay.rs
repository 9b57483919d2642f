//! Run Relay use case.
//!
//! Drives one forward-request from validation to its terminal output:
//!
//! 1. Resolve the payload's route; an invalid payload ends with an error
//!    and the sentinel, never retried
//! 2. Stream an attempt from the upstream provider through the
//!    [`OutboundGate`], filtering to the session's participant
//! 3. Judge the finished attempt with a [`HealthVerdict`]
//! 4. Retry empty or transiently failed attempts with exponential backoff,
//!    reusing the session's abort handle
//!
//! Every session that is not cancelled sends exactly one sentinel.
//! A cancelled session ends silently.

use super::outbound_gate::OutboundGate;
use super::relay_session::RelaySession;
use crate::config::RelayParams;
use crate::ports::coordinator::CoordinatorLink;
use crate::ports::event_logger::{NoRelayEventLogger, RelayEvent, RelayEventLogger};
use crate::ports::upstream::{UpstreamError, UpstreamProvider};
use relay_domain::{
    ChunkKind, ForwardRequest, HealthEvidence, HealthVerdict, HostVisibility, LineDecoder,
    PayloadError, RelayOutput, RelayPayload, RetryNotice, RetryPolicy, Route, StreamChunk,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// How a relay session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Sentinel sent after a healthy (or accepted) attempt.
    Completed { attempts: u32 },
    /// Payload failed validation; no upstream call was made.
    Invalid(PayloadError),
    /// The provider refused the request or reported an in-band error.
    Rejected(String),
    /// A transient failure that could not be retried.
    Failed(String),
    /// Every permitted attempt was empty or failed.
    Exhausted { attempts: u32, reason: String },
    /// Cancelled by the Coordinator; nothing further was sent.
    Cancelled,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed { .. } => "completed",
            SessionOutcome::Invalid(_) => "invalid",
            SessionOutcome::Rejected(_) => "rejected",
            SessionOutcome::Failed(_) => "failed",
            SessionOutcome::Exhausted { .. } => "exhausted",
            SessionOutcome::Cancelled => "cancelled",
        }
    }
}

/// Result of a single streaming attempt.
#[derive(Debug)]
enum AttemptOutcome {
    Finished {
        verdict: HealthVerdict,
        content_forwarded: bool,
    },
    Transient {
        error: UpstreamError,
        content_forwarded: bool,
    },
    Rejected(String),
    Cancelled,
}

/// Per-attempt bookkeeping for accepted lines.
struct AttemptState {
    route: Route,
    evidence: HealthEvidence,
    content_forwarded: bool,
}

impl AttemptState {
    fn new(route: Route) -> Self {
        Self {
            route,
            evidence: HealthEvidence::new(),
            content_forwarded: false,
        }
    }

    /// Classify, filter and forward one line. Returns an outcome when the
    /// line ends the attempt.
    async fn accept(
        &mut self,
        line: String,
        session: &RelaySession,
        gate: &mut OutboundGate,
    ) -> Option<AttemptOutcome> {
        let chunk = StreamChunk::classify(line);
        if !self.route.accepts(chunk.participant()) {
            trace!("Relay {}: dropped line for other participant", session.id().short());
            return None;
        }

        if chunk.kind() == ChunkKind::Error {
            let message = chunk
                .error_message()
                .unwrap_or_else(|| "Upstream reported an error".to_string());
            return Some(AttemptOutcome::Rejected(message));
        }

        let is_content = chunk.carries_content();
        self.evidence.record(chunk.len(), is_content);

        if session.is_cancelled() {
            return Some(AttemptOutcome::Cancelled);
        }
        let mut fragment = chunk.raw().to_string();
        fragment.push('\n');
        gate.forward(fragment).await;
        self.content_forwarded |= is_content;
        None
    }
}

enum Step {
    Flush,
    Read(Result<Result<Option<Vec<u8>>, UpstreamError>, tokio::time::error::Elapsed>),
}

/// Use case for relaying one forward-request.
pub struct RunRelayUseCase {
    upstream: Arc<dyn UpstreamProvider>,
    link: Arc<dyn CoordinatorLink>,
    visibility: watch::Receiver<HostVisibility>,
    params: RelayParams,
    event_logger: Arc<dyn RelayEventLogger>,
}

impl Clone for RunRelayUseCase {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            link: self.link.clone(),
            visibility: self.visibility.clone(),
            params: self.params.clone(),
            event_logger: self.event_logger.clone(),
        }
    }
}

impl RunRelayUseCase {
    pub fn new(
        upstream: Arc<dyn UpstreamProvider>,
        link: Arc<dyn CoordinatorLink>,
        visibility: watch::Receiver<HostVisibility>,
        params: RelayParams,
    ) -> Self {
        Self {
            upstream,
            link,
            visibility,
            params,
            event_logger: Arc::new(NoRelayEventLogger),
        }
    }

    /// Create with a relay event logger.
    pub fn with_event_logger(mut self, logger: Arc<dyn RelayEventLogger>) -> Self {
        self.event_logger = logger;
        self
    }

    pub fn params(&self) -> &RelayParams {
        &self.params
    }

    /// Relay `request` until it reaches a terminal state.
    pub async fn execute(
        &self,
        session: Arc<RelaySession>,
        request: ForwardRequest,
    ) -> SessionOutcome {
        let policy = request.retry.apply_to(&self.params.retry);
        let mut gate = OutboundGate::new(
            session.clone(),
            self.link.clone(),
            self.visibility.clone(),
            self.params.backpressure.clone(),
        );

        info!(
            "Relay {}: starting (model: {}, mode: {})",
            session.id(),
            request.payload.target_model_id.as_deref().unwrap_or("-"),
            request.payload.mode.as_deref().unwrap_or("direct_chat"),
        );
        self.event_logger.log(RelayEvent::new(
            "session_started",
            json!({
                "request_id": session.id(),
                "target_model_id": request.payload.target_model_id,
                "mode": request.payload.mode,
                "retry": policy,
            }),
        ));

        let outcome = match request.payload.resolve() {
            Ok(route) => {
                self.relay_with_retries(&session, &request.payload, route, &policy, &mut gate)
                    .await
            }
            Err(e) => {
                warn!("Relay {}: invalid payload: {}", session.id(), e);
                gate.emit(RelayOutput::Error(e.to_string())).await;
                gate.emit(RelayOutput::Done).await;
                SessionOutcome::Invalid(e)
            }
        };

        info!("Relay {}: finished ({})", session.id(), outcome.as_str());
        self.event_logger.log(RelayEvent::new(
            "session_finished",
            json!({
                "request_id": session.id(),
                "outcome": outcome.as_str(),
                "retries": session.retry_count(),
            }),
        ));
        outcome
    }

    async fn relay_with_retries(
        &self,
        session: &Arc<RelaySession>,
        payload: &RelayPayload,
        route: Route,
        policy: &RetryPolicy,
        gate: &mut OutboundGate,
    ) -> SessionOutcome {
        loop {
            let retry_count = session.retry_count();
            let attempts = retry_count + 1;

            let reason = match self.run_attempt(session, payload, route, gate).await {
                AttemptOutcome::Cancelled => return SessionOutcome::Cancelled,
                AttemptOutcome::Rejected(message) => {
                    warn!("Relay {}: rejected: {}", session.id(), message);
                    gate.emit(RelayOutput::Error(message.clone())).await;
                    gate.emit(RelayOutput::Done).await;
                    return SessionOutcome::Rejected(message);
                }
                AttemptOutcome::Finished {
                    verdict,
                    content_forwarded,
                } => {
                    self.log_attempt(session, attempts, &verdict);
                    if !verdict.is_empty {
                        gate.emit(RelayOutput::Done).await;
                        return SessionOutcome::Completed { attempts };
                    }
                    // Text already reached the Coordinator; a retry would append to it
                    if content_forwarded && !verdict.has_strong_signal() {
                        debug!(
                            "Relay {}: short answer already forwarded, not retrying ({})",
                            session.id(),
                            verdict.reason()
                        );
                        gate.emit(RelayOutput::Done).await;
                        return SessionOutcome::Completed { attempts };
                    }
                    if !policy.enabled {
                        debug!("Relay {}: empty response, retries disabled", session.id());
                        gate.emit(RelayOutput::Done).await;
                        return SessionOutcome::Completed { attempts };
                    }
                    verdict.reason()
                }
                AttemptOutcome::Transient {
                    error,
                    content_forwarded,
                } => {
                    warn!(
                        "Relay {}: attempt {} failed: {}",
                        session.id(),
                        attempts,
                        error
                    );
                    if content_forwarded || !policy.enabled {
                        let message = error.to_string();
                        gate.emit(RelayOutput::Error(message.clone())).await;
                        gate.emit(RelayOutput::Done).await;
                        return SessionOutcome::Failed(message);
                    }
                    error.to_string()
                }
            };

            if session.is_cancelled() {
                return SessionOutcome::Cancelled;
            }

            if !policy.allows_retry(retry_count) {
                warn!(
                    "Relay {}: giving up after {} attempts ({})",
                    session.id(),
                    attempts,
                    reason
                );
                gate.emit(RelayOutput::Error(format!(
                    "Retries exhausted after {} attempts: {}",
                    attempts, reason
                )))
                .await;
                gate.emit(RelayOutput::Done).await;
                return SessionOutcome::Exhausted { attempts, reason };
            }

            let delay = policy.delay_for(retry_count);
            info!(
                "Relay {}: retry {}/{} in {}ms ({})",
                session.id(),
                attempts,
                policy.max_retries,
                delay.as_millis(),
                reason
            );
            self.event_logger.log(RelayEvent::new(
                "retry_scheduled",
                json!({
                    "request_id": session.id(),
                    "attempt": attempts,
                    "max_attempts": policy.max_retries,
                    "delay_ms": delay.as_millis() as u64,
                    "reason": reason,
                }),
            ));
            if policy.show_retry_info {
                gate.emit(RelayOutput::RetryNotice(RetryNotice {
                    attempt: attempts,
                    max_attempts: policy.max_retries,
                    delay: delay.as_millis() as u64,
                    reason,
                }))
                .await;
            }

            tokio::select! {
                biased;
                _ = session.abort_handle().cancelled() => return SessionOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            session.begin_retry();
        }
    }

    async fn run_attempt(
        &self,
        session: &RelaySession,
        payload: &RelayPayload,
        route: Route,
        gate: &mut OutboundGate,
    ) -> AttemptOutcome {
        if session.is_cancelled() {
            return AttemptOutcome::Cancelled;
        }

        let abort = session.abort_handle();
        let started = Instant::now();

        let opened = tokio::select! {
            biased;
            _ = abort.cancelled() => return AttemptOutcome::Cancelled,
            opened = self.upstream.open(payload) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) if error.is_transient() => {
                return AttemptOutcome::Transient {
                    error,
                    content_forwarded: false,
                };
            }
            Err(error) => return AttemptOutcome::Rejected(error.to_string()),
        };
        debug!("Relay {}: upstream stream open", session.id());

        let mut decoder = LineDecoder::new();
        let mut state = AttemptState::new(route);

        loop {
            let step = tokio::select! {
                biased;
                _ = abort.cancelled() => return AttemptOutcome::Cancelled,
                _ = gate.flush_due() => Step::Flush,
                read = tokio::time::timeout(self.params.idle_timeout, stream.next_chunk()) => {
                    Step::Read(read)
                }
            };

            let bytes = match step {
                Step::Flush => {
                    gate.flush().await;
                    continue;
                }
                Step::Read(Err(_)) => {
                    return AttemptOutcome::Transient {
                        error: UpstreamError::IdleTimeout(self.params.idle_timeout),
                        content_forwarded: state.content_forwarded,
                    };
                }
                Step::Read(Ok(Err(error))) if error.is_transient() => {
                    return AttemptOutcome::Transient {
                        error,
                        content_forwarded: state.content_forwarded,
                    };
                }
                Step::Read(Ok(Err(error))) => return AttemptOutcome::Rejected(error.to_string()),
                Step::Read(Ok(Ok(None))) => break,
                Step::Read(Ok(Ok(Some(bytes)))) => bytes,
            };

            let lines = match decoder.push(&bytes) {
                Ok(lines) => lines,
                Err(e) => return AttemptOutcome::Rejected(e.to_string()),
            };
            for line in lines {
                if let Some(outcome) = state.accept(line, session, gate).await {
                    return outcome;
                }
            }
        }

        if let Some(line) = decoder.finish()
            && let Some(outcome) = state.accept(line, session, gate).await
        {
            return outcome;
        }

        gate.flush().await;
        if session.is_cancelled() {
            return AttemptOutcome::Cancelled;
        }

        let evidence = state.evidence.finish(started.elapsed());
        AttemptOutcome::Finished {
            verdict: HealthVerdict::assess(evidence, &self.params.health),
            content_forwarded: state.content_forwarded,
        }
    }

    fn log_attempt(&self, session: &RelaySession, attempt: u32, verdict: &HealthVerdict) {
        debug!(
            "Relay {}: attempt {} finished ({} lines, {} bytes, {}ms, empty: {})",
            session.id(),
            attempt,
            verdict.evidence.chunk_count,
            verdict.evidence.byte_count,
            verdict.evidence.elapsed.as_millis(),
            verdict.is_empty
        );
        self.event_logger.log(RelayEvent::new(
            "attempt_finished",
            json!({
                "request_id": session.id(),
                "attempt": attempt,
                "verdict": verdict,
            }),
        ));
    }
}
