//! Relay engine: routes control-channel commands to use cases.
//!
//! Each forward-request runs on its own task; the session is removed from
//! the registry when that task ends, whatever the outcome.

use super::cancel_request::CancelRequestUseCase;
use super::run_relay::{RunRelayUseCase, SessionOutcome};
use super::session_registry::SessionRegistry;
use crate::ports::command_sink::CommandSink;
use relay_domain::{ForwardRequest, RelayCommand};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

pub struct RelayEngine {
    registry: Arc<SessionRegistry>,
    run_relay: RunRelayUseCase,
    cancel_request: CancelRequestUseCase,
    tasks: TaskTracker,
}

impl RelayEngine {
    pub fn new(registry: Arc<SessionRegistry>, run_relay: RunRelayUseCase) -> Self {
        Self {
            cancel_request: CancelRequestUseCase::new(registry.clone()),
            registry,
            run_relay,
            tasks: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Start relaying `request` on a new task.
    ///
    /// Returns `None` when the id is live or already finished, or after
    /// [`shutdown`](Self::shutdown); nothing is sent to the Coordinator in
    /// that case.
    pub fn start(&self, request: ForwardRequest) -> Option<JoinHandle<SessionOutcome>> {
        if self.tasks.is_closed() {
            warn!(
                "Relay: shutting down, ignoring forward-request {}",
                request.request_id
            );
            return None;
        }

        let session = match self.registry.create(request.request_id.clone()) {
            Ok(session) => session,
            Err(e) => {
                error!("Relay: refusing forward-request: {}", e);
                return None;
            }
        };

        let registry = self.registry.clone();
        let run_relay = self.run_relay.clone();
        Some(self.tasks.spawn(async move {
            let outcome = run_relay.execute(session.clone(), request).await;
            registry.remove(session.id());
            outcome
        }))
    }

    /// Cancel every live session and stop accepting new ones.
    pub fn shutdown(&self) -> usize {
        self.tasks.close();
        let cancelled = self.registry.cancel_all();
        info!("Relay: shutting down, cancelled {} session(s)", cancelled);
        cancelled
    }

    /// Wait until every session task has ended. Only returns after
    /// [`shutdown`](Self::shutdown).
    pub async fn wait(&self) {
        self.tasks.wait().await;
    }
}

impl CommandSink for RelayEngine {
    fn dispatch(&self, command: RelayCommand) {
        match command {
            RelayCommand::ForwardRequest(request) => {
                self.start(request);
            }
            RelayCommand::CancelRequest { request_id } => {
                self.cancel_request.execute(&request_id);
            }
            RelayCommand::Reload => {
                let cancelled = self.registry.cancel_all();
                info!("Relay: reload requested, cancelled {} session(s)", cancelled);
            }
            RelayCommand::ActivateCapture => {
                info!("Relay: activate-capture is not handled by this relay");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayParams;
    use crate::use_cases::run_relay::tests::{
        RecordingLink, ScriptedUpstream, Step, healthy, payload, request,
    };
    use relay_domain::{HostVisibility, RelayOutput, RequestId};
    use std::time::Duration;
    use tokio::sync::watch;

    fn engine(
        scripts: Vec<Vec<Step>>,
    ) -> (RelayEngine, Arc<RecordingLink>, watch::Sender<HostVisibility>) {
        let upstream = Arc::new(ScriptedUpstream::new(scripts.into_iter().map(Ok).collect()));
        let link = Arc::new(RecordingLink::default());
        let (tx, rx) = watch::channel(HostVisibility::Foreground);
        let run_relay = RunRelayUseCase::new(upstream, link.clone(), rx, RelayParams::default());
        (
            RelayEngine::new(Arc::new(SessionRegistry::new()), run_relay),
            link,
            tx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_runs_and_removes_session() {
        let (engine, link, _tx) = engine(vec![healthy()]);
        let handle = engine.start(request("e1", payload())).unwrap();
        assert_eq!(engine.registry().len(), 1);

        assert_eq!(handle.await.unwrap(), SessionOutcome::Completed { attempts: 1 });
        assert!(engine.registry().is_empty());
        assert_eq!(link.outputs().last(), Some(&RelayOutput::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_forward_is_refused() {
        let (engine, link, _tx) = engine(vec![healthy()]);
        let handle = engine.start(request("e2", payload())).unwrap();
        assert!(engine.start(request("e2", payload())).is_none());
        handle.await.unwrap();

        // Finished ids are not resurrected either
        assert!(engine.start(request("e2", payload())).is_none());
        let done = link.outputs().iter().filter(|o| o.is_sentinel()).count();
        assert_eq!(done, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_command_reaches_running_session() {
        let (engine, link, _tx) = engine(vec![vec![
            Step::Bytes("a0:\"partial\"\n"),
            Step::Wait(Duration::from_secs(30)),
        ]]);
        engine.dispatch(RelayCommand::ForwardRequest(request("e3", payload())));
        tokio::time::sleep(Duration::from_millis(10)).await;

        engine.dispatch(RelayCommand::CancelRequest {
            request_id: RequestId::new("e3").unwrap(),
        });
        engine.shutdown();
        engine.wait().await;

        assert!(engine.registry().is_empty());
        assert!(link.outputs().iter().all(|o| !o.is_sentinel()));
        // Cancelling an already finished id is harmless
        engine.dispatch(RelayCommand::CancelRequest {
            request_id: RequestId::new("e3").unwrap(),
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_cancels_all_sessions() {
        let (engine, link, _tx) = engine(vec![vec![Step::Wait(Duration::from_secs(30))]]);
        engine.dispatch(RelayCommand::ForwardRequest(request("e4", payload())));
        engine.dispatch(RelayCommand::ForwardRequest(request("e5", payload())));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.registry().len(), 2);

        engine.dispatch(RelayCommand::Reload);
        engine.shutdown();
        engine.wait().await;

        assert!(engine.registry().is_empty());
        assert!(link.outputs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_after_shutdown_is_refused() {
        let (engine, link, _tx) = engine(vec![healthy()]);
        engine.shutdown();

        assert!(engine.start(request("late", payload())).is_none());
        engine.dispatch(RelayCommand::ForwardRequest(request("later", payload())));
        engine.wait().await;

        assert!(engine.registry().is_empty());
        assert!(link.outputs().is_empty());
    }
}
