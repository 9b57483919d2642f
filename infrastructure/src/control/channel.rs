//! WebSocket control channel to the Coordinator.
//!
//! Maintains exactly one connection. After any disconnect it waits a fixed
//! delay and reconnects, indefinitely, until shutdown. Each connection:
//!
//! 1. announces this instance with an identity frame
//! 2. spawns a writer task draining the outbound queue
//! 3. reads commands and hands them to a [`CommandSink`]
//!
//! Outbound frames are never queued across a reconnection: while no
//! connection is open [`send`](CoordinatorLink::send) drops the output.

use super::protocol::{IdentityAnnouncement, encode_outbound, parse_inbound};
use futures::{SinkExt, StreamExt};
use relay_application::{CommandSink, CoordinatorLink};
use relay_domain::{RelayOutput, RequestId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// How long a closing connection may spend writing already queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub struct ControlChannel {
    url: String,
    instance_id: String,
    reconnect_delay: Duration,
    /// Sender of the currently open connection's writer task.
    outbound: RwLock<Option<mpsc::UnboundedSender<String>>>,
    /// Frames enqueued but not yet written.
    depth: Arc<AtomicUsize>,
}

impl ControlChannel {
    pub fn new(
        url: impl Into<String>,
        instance_id: impl Into<String>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            instance_id: instance_id.into(),
            reconnect_delay,
            outbound: RwLock::new(None),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connect, serve and reconnect until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, sink: Arc<dyn CommandSink>, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            info!("Control: connecting to {}", self.url);
            match self.connect_and_serve(sink.as_ref(), &shutdown).await {
                Ok(()) => info!("Control: connection closed"),
                Err(e) => warn!("Control: connection error: {}", e),
            }
            self.detach();

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        info!("Control: stopped");
    }

    async fn connect_and_serve(
        &self,
        sink: &dyn CommandSink,
        shutdown: &CancellationToken,
    ) -> Result<(), ControlError> {
        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            connected = tokio_tungstenite::connect_async(self.url.as_str()) => connected,
        };
        let (ws_stream, _response) = connected?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(
                IdentityAnnouncement::new(&self.instance_id).encode().into(),
            ))
            .await?;
        info!("Control: connected as instance {}", self.instance_id);

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        self.attach(tx);

        let depth = self.depth.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let result = write.send(Message::Text(frame.into())).await;
                saturating_decrement(&depth);
                if let Err(e) = result {
                    debug!("Control: writer stopped: {}", e);
                    return;
                }
            }
            let _ = write.close().await;
        });

        let result = loop {
            let msg = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                msg = read.next() => msg,
            };

            match msg {
                None | Some(Ok(Message::Close(_))) => break Ok(()),
                Some(Err(e)) => break Err(e.into()),
                Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str(), sink),
                Some(Ok(other)) => trace!("Control: ignoring non-text frame ({} bytes)", other.len()),
            }
        };

        // Dropping the sender lets the writer drain and close the socket
        self.detach();
        let _ = tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await;
        result
    }

    fn handle_frame(&self, text: &str, sink: &dyn CommandSink) {
        match parse_inbound(text) {
            Ok(command) => {
                debug!("Control: received {}", command.name());
                sink.dispatch(command);
            }
            Err(e) => warn!("Control: skipping malformed frame: {}", e),
        }
    }

    fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        let mut outbound = self.outbound.write().unwrap_or_else(|e| e.into_inner());
        *outbound = Some(tx);
    }

    fn detach(&self) {
        let mut outbound = self.outbound.write().unwrap_or_else(|e| e.into_inner());
        if outbound.take().is_some() {
            self.depth.store(0, Ordering::SeqCst);
        }
    }
}

fn saturating_decrement(depth: &AtomicUsize) {
    let _ = depth.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
        Some(d.saturating_sub(1))
    });
}

impl CoordinatorLink for ControlChannel {
    fn send(&self, request_id: &RequestId, output: RelayOutput) {
        let frame = encode_outbound(request_id, &output);
        let outbound = self.outbound.read().unwrap_or_else(|e| e.into_inner());

        match outbound.as_ref() {
            Some(tx) => {
                // Count before sending so the writer never decrements first
                self.depth.fetch_add(1, Ordering::SeqCst);
                if tx.send(frame).is_err() {
                    saturating_decrement(&self.depth);
                    warn!("Control: connection closing, dropped output for {}", request_id);
                }
            }
            None => warn!("Control: not connected, dropped output for {}", request_id),
        }
    }

    fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::RelayCommand;
    use serde_json::Value;
    use tokio::net::TcpListener;

    struct RecordingSink(mpsc::UnboundedSender<RelayCommand>);

    impl CommandSink for RecordingSink {
        fn dispatch(&self, command: RelayCommand) {
            let _ = self.0.send(command);
        }
    }

    fn text(msg: Message) -> String {
        match msg {
            Message::Text(t) => t.as_str().to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    fn connected(channel: &ControlChannel) -> bool {
        channel.outbound.read().unwrap().is_some()
    }

    #[test]
    fn send_without_connection_is_dropped() {
        let channel = ControlChannel::new("ws://127.0.0.1:1/ws", "i", Duration::from_secs(5));
        channel.send(&RequestId::new("r").unwrap(), RelayOutput::Done);
        assert!(!connected(&channel));
        assert_eq!(channel.queue_depth(), 0);
    }

    #[tokio::test]
    async fn loopback_commands_and_outputs() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let channel = Arc::new(ControlChannel::new(
            format!("ws://{addr}"),
            "instance-1",
            Duration::from_millis(50),
        ));
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let run = tokio::spawn(
            channel
                .clone()
                .run(Arc::new(RecordingSink(cmd_tx)), shutdown.clone()),
        );

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let identity: Value = serde_json::from_str(&text(ws.next().await.unwrap().unwrap())).unwrap();
        assert_eq!(identity["tab_id"], "instance-1");

        for frame in [
            r#"{"command": "cancel_request", "request_id": "r1"}"#,
            "garbage",
            r#"{"command": "reload"}"#,
        ] {
            ws.send(Message::Text(frame.to_string().into())).await.unwrap();
        }
        assert_eq!(
            cmd_rx.recv().await.unwrap(),
            RelayCommand::CancelRequest {
                request_id: RequestId::new("r1").unwrap()
            }
        );
        assert_eq!(cmd_rx.recv().await.unwrap(), RelayCommand::Reload);

        assert!(connected(&channel));
        channel.send(&RequestId::new("r1").unwrap(), RelayOutput::Done);
        let out: Value = serde_json::from_str(&text(ws.next().await.unwrap().unwrap())).unwrap();
        assert_eq!(out["request_id"], "r1");
        assert_eq!(out["data"], "[DONE]");

        shutdown.cancel();
        run.await.unwrap();
        assert!(!connected(&channel));
    }

    #[tokio::test]
    async fn reconnects_and_reannounces() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let channel = Arc::new(ControlChannel::new(
            format!("ws://{addr}"),
            "instance-2",
            Duration::from_millis(20),
        ));
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let run = tokio::spawn(
            channel
                .clone()
                .run(Arc::new(RecordingSink(cmd_tx)), shutdown.clone()),
        );

        for _ in 0..2 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let identity: Value =
                serde_json::from_str(&text(ws.next().await.unwrap().unwrap())).unwrap();
            assert_eq!(identity["tab_id"], "instance-2");
            ws.close(None).await.unwrap();
        }

        shutdown.cancel();
        run.await.unwrap();
    }
}
