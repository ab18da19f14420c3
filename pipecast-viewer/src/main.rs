//! pipecast viewer: headless front end for a capture peer.
//!
//! ```text
//! pipecast-viewer                    Connect with defaults
//! pipecast-viewer --config <path>    Use custom config TOML
//! pipecast-viewer --server host:port Override the peer address
//! pipecast-viewer --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use pipecast_core::session::lock;
use pipecast_core::{PipeMonitor, SessionEnd, StreamClient, shared_monitor};

use pipecast_viewer::config::ViewerConfig;
use pipecast_viewer::{logging, report};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pipecast-viewer", about = "Multi-pipe NV12 stream viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "pipecast-viewer.toml")]
    config: PathBuf,

    /// Capture peer address (overrides config). Example: 192.168.1.10:8000
    #[arg(short, long)]
    server: Option<String>,

    /// Log filter directive (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.address = addr;
    }
    logging::init(&config.logging, cli.log_level.as_deref());

    info!("pipecast-viewer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Start the session ────────────────────────────────────

    let monitor = shared_monitor(PipeMonitor::new());
    let mut events = lock(&monitor).subscribe();
    let client = Arc::new(StreamClient::new(config.session(), Arc::clone(&monitor)));

    let mut session = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.run().await }
    });

    // ── 2. Event loop ───────────────────────────────────────────

    let period = Duration::from_secs(config.report.interval_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    let mut stopping = false;

    let outcome = loop {
        tokio::select! {
            res = &mut session => break res,
            _ = tokio::signal::ctrl_c(), if !stopping => {
                info!("interrupt received, stopping session");
                stopping = true;
                client.stop();
            }
            _ = ticker.tick(), if config.report.interval_secs > 0 => {
                let mon = lock(&monitor);
                for line in report::pipe_summary(&mon) {
                    println!("{line}");
                }
            }
            ev = events.recv() => match ev {
                Ok(ev) => info!("{}", report::describe(&ev)),
                Err(RecvError::Lagged(n)) => warn!("dropped {n} monitor events"),
                Err(RecvError::Closed) => {}
            },
        }
    };

    // ── 3. Shutdown ─────────────────────────────────────────────

    match outcome {
        Ok(Ok(SessionEnd::AlreadyConnected)) => warn!("session already running"),
        Ok(Ok(end)) => info!(?end, "session finished"),
        Ok(Err(e)) => {
            error!("session error: {e}");
            return Err(e.into());
        }
        Err(e) => error!("session task failed: {e}"),
    }
    info!("status: {}", lock(&monitor).status());

    Ok(())
}
