//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for stream-relay
#[derive(Parser, Debug)]
#[command(name = "stream-relay")]
#[command(author, version, about = "Relay provider response streams to a coordinating server")]
#[command(long_about = r#"
stream-relay keeps one WebSocket connection to a Coordinator. For every
forward-request it receives, it streams the response from the upstream
provider back over that connection, retrying empty responses with
exponential backoff.

Configuration files are loaded from (in priority order):
1. STREAM_RELAY_* environment variables (e.g. STREAM_RELAY_CONTROL__URL)
2. --config <path>     Explicit config file
3. ./relay.toml        Project-level config
4. ~/.config/stream-relay/config.toml   Global config

Host visibility (Unix): send SIGUSR1 to batch output as if backgrounded,
SIGUSR2 to return to per-chunk forwarding.

Example:
  stream-relay --upstream-endpoint 'https://provider.example/stream/{session_id}'
  stream-relay -vv --coordinator-url ws://10.0.0.2:5102/ws --config relay.toml
"#)]
pub struct Cli {
    /// Coordinator WebSocket URL (overrides control.url)
    #[arg(long, value_name = "URL")]
    pub coordinator_url: Option<String>,

    /// Upstream endpoint; may contain {session_id} (overrides upstream.endpoint)
    #[arg(long, value_name = "URL")]
    pub upstream_endpoint: Option<String>,

    /// Start with the host backgrounded (batch outgoing fragments)
    #[arg(long)]
    pub background: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
