//! Host visibility driven by Unix signals.
//!
//! `SIGUSR1` marks the host backgrounded, `SIGUSR2` brings it back to the
//! foreground. The current state is published on a `watch` channel read by
//! every relay session's outbound gate.

use relay_domain::HostVisibility;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Create the visibility channel with its initial state.
pub fn visibility_channel(
    start_backgrounded: bool,
) -> (watch::Sender<HostVisibility>, watch::Receiver<HostVisibility>) {
    let initial = if start_backgrounded {
        HostVisibility::Background
    } else {
        HostVisibility::Foreground
    };
    watch::channel(initial)
}

/// Publish a visibility change. Returns whether the state changed.
pub fn set_visibility(tx: &watch::Sender<HostVisibility>, visibility: HostVisibility) -> bool {
    let changed = tx.send_if_modified(|current| {
        if *current == visibility {
            false
        } else {
            *current = visibility;
            true
        }
    });
    if changed {
        info!("Host: now {:?}", visibility);
    }
    changed
}

/// Translate `SIGUSR1`/`SIGUSR2` into visibility changes until shutdown.
#[cfg(unix)]
pub async fn watch_signals(
    tx: watch::Sender<HostVisibility>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut background = signal(SignalKind::user_defined1())?;
    let mut foreground = signal(SignalKind::user_defined2())?;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            _ = background.recv() => { set_visibility(&tx, HostVisibility::Background); }
            _ = foreground.recv() => { set_visibility(&tx, HostVisibility::Foreground); }
        }
    }
}

/// Without Unix signals the initial visibility is kept.
#[cfg(not(unix))]
pub async fn watch_signals(
    _tx: watch::Sender<HostVisibility>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    shutdown.cancelled().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(*visibility_channel(false).1.borrow(), HostVisibility::Foreground);
        assert_eq!(*visibility_channel(true).1.borrow(), HostVisibility::Background);
    }

    #[test]
    fn test_set_visibility_only_notifies_changes() {
        let (tx, mut rx) = visibility_channel(false);
        assert!(!set_visibility(&tx, HostVisibility::Foreground));
        assert!(!rx.has_changed().unwrap());

        assert!(set_visibility(&tx, HostVisibility::Background));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_background());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_watch_signals_stops_on_shutdown() {
        let (tx, _rx) = visibility_channel(false);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        watch_signals(tx, shutdown).await.unwrap();
    }
}
