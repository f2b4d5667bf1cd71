// CLI entry point for the Player Piano relay.
//
// Starts a standalone relay that listeners connect to. Each listener gets
// its own engine; see `server.rs` for the networking architecture and
// `session.rs` for per-listener state.
//
// Usage:
//   relay [--port 7979] [--tick-ms 120] [--max-listeners 16]
//         [--style default] [--config engine.json]
//
// Log level follows RUST_LOG (default `info`). The process runs until
// killed; SIGINT/SIGTERM tear the relay threads down with it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use player_piano_engine::{EngineConfig, Style};
use player_piano_relay::{RelayConfig, start_relay};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Stream Player Piano events to TCP listeners")]
#[command(version)]
struct Cli {
    /// Listen port (0 picks a free one)
    #[arg(long, default_value_t = 7979)]
    port: u16,

    /// Milliseconds between events
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Maximum simultaneous listeners
    #[arg(long, default_value_t = 16)]
    max_listeners: u32,

    /// Style new listeners start in
    #[arg(long, default_value = "default")]
    style: Style,

    /// JSON engine config
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let config = RelayConfig {
        port: cli.port,
        tick_interval_ms: cli.tick_ms,
        max_listeners: cli.max_listeners,
        default_style: cli.style,
        engine,
    };
    let (_handle, addr) = start_relay(config).context("starting relay")?;
    info!(%addr, "relay ready; press Ctrl+C to stop");

    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}
