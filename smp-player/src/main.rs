//! Streaming media player console (smp-player) - Main entry point
//!
//! Loads configuration, connects the engine over the simulated transport,
//! enqueues any locators given on the command line and then reads
//! commands from stdin until `quit`, end of input, or Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use smp_common::config::TomlConfig;
use smp_common::logging::{init_logging, LogLevel};
use smp_player::{EngineConfig, MediaPlayerEngine, SimulatedTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

mod console;

use console::Flow;

/// Command-line arguments for smp-player
#[derive(Parser, Debug)]
#[command(name = "smp-player")]
#[command(about = "Streaming media player console")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Media server endpoint (overrides config)
    #[arg(short, long, env = "SMP_ENDPOINT")]
    endpoint: Option<String>,

    /// Log level: none, error, warning, info, debug, trace (overrides config)
    #[arg(long, env = "SMP_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Tick interval in milliseconds (100-1000)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Wrap around at either end of the playlist
    #[arg(long)]
    wrap: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Locators to enqueue at startup
    locators: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_path) = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(endpoint) = &args.endpoint {
        config.server.endpoint = endpoint.clone();
    }
    if let Some(tick_ms) = args.tick_ms {
        config.playback.tick_interval_ms = tick_ms;
    }
    if args.wrap {
        config.playback.wrap_playlist = true;
    }

    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting smp-player v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let engine = MediaPlayerEngine::new(
        EngineConfig::from_toml(&config),
        Arc::new(SimulatedTransport::new()),
    );

    let printer = tokio::spawn(print_events(engine.subscribe_channel(), args.json));

    for locator in &args.locators {
        engine
            .enqueue(locator.clone())
            .await
            .with_context(|| format!("Failed to enqueue {}", locator))?;
    }

    engine.connect().await;
    let status = engine.wait_for_connection().await;
    if !status.is_connected {
        warn!("Not connected to {}; use 'connect' to retry", config.server.endpoint);
    }

    tokio::select! {
        result = command_loop(&engine) => result?,
        _ = shutdown_signal() => {}
    }

    engine.close().await;
    printer.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Read and execute commands from stdin until quit or end of input
async fn command_loop(engine: &MediaPlayerEngine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", console::HELP);

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        match console::execute(engine, command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("error: {}", e),
        }
    }
    Ok(())
}

/// Print events from the broadcast mirror until the channel closes
async fn print_events(
    mut rx: tokio::sync::broadcast::Receiver<smp_common::events::PlayerEvent>,
    json: bool,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                } else if let Some(line) = console::format_event(&event) {
                    println!("* {}", line);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("Event printer lagged, {} events skipped", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
