//! CLI entrypoint for stream-relay
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use relay_application::{RelayEngine, RunRelayUseCase, SessionRegistry};
use relay_infrastructure::{
    ConfigLoader, ControlChannel, FileConfig, HttpUpstreamProvider, JsonlRelayEventLogger,
    visibility_channel, watch_signals,
};
use relay_presentation::Cli;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

const LOG_FILE_PREFIX: &str = "stream-relay.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    apply_cli_overrides(&mut config, &cli);

    let _log_guard = init_tracing(cli.verbose, config.logging.dir.as_deref())?;

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            error!("Config: {}", issue);
        }
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    let instance_id = Uuid::new_v4().to_string();
    info!(
        "Starting stream-relay {} (instance {})",
        env!("CARGO_PKG_VERSION"),
        instance_id
    );

    // === Dependency Injection ===
    let (visibility_tx, visibility_rx) = visibility_channel(config.host.start_backgrounded);

    let channel = Arc::new(ControlChannel::new(
        config.control.url.clone(),
        instance_id,
        Duration::from_secs(config.control.reconnect_delay_secs),
    ));

    let upstream = Arc::new(HttpUpstreamProvider::new(
        config.upstream.endpoint.clone(),
        &config.upstream.headers,
        Duration::from_secs(config.upstream.connect_timeout_secs),
    )?);

    let mut run_relay =
        RunRelayUseCase::new(upstream, channel.clone(), visibility_rx, config.relay_params());
    if let Some(path) = &config.logging.events_file {
        match JsonlRelayEventLogger::open(path) {
            Ok(logger) => {
                info!("Relay events logged to {}", logger.path().display());
                run_relay = run_relay.with_event_logger(Arc::new(logger));
            }
            Err(e) => warn!("Relay event log {} unavailable: {}", path.display(), e),
        }
    }

    let engine = Arc::new(RelayEngine::new(Arc::new(SessionRegistry::new()), run_relay));

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(watch_signals(visibility_tx, shutdown.clone()));
    let control = tokio::spawn(channel.clone().run(engine.clone(), shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    shutdown.cancel();
    engine.shutdown();
    engine.wait().await;

    let _ = control.await;
    if let Ok(Err(e)) = signals.await {
        warn!("Host visibility signals unavailable: {}", e);
    }

    Ok(())
}

/// Command-line flags take precedence over every configuration source.
fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(url) = &cli.coordinator_url {
        config.control.url = url.clone();
    }
    if let Some(endpoint) = &cli.upstream_endpoint {
        config.upstream.endpoint = endpoint.clone();
    }
    if cli.background {
        config.host.start_backgrounded = true;
    }
}

/// Initialize logging based on verbosity level.
///
/// - 0 (default): warnings and errors, or `RUST_LOG` when set
/// - 1 (-v): info
/// - 2 (-vv): debug
/// - 3+ (-vvv): trace
///
/// With a log directory, a daily rolling file receives the same events.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    Ok(guard)
}
