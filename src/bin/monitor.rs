//! Connects to every agent endpoint and logs the link status.
//!
//! Usage:
//!   maicraft-monitor
//!   maicraft-monitor --ws-url ws://127.0.0.1:8000 --interval 10

mod common;

use std::time::Duration;

use clap::Parser;
use maicraft_link::{Hub, LinkConfig, LinkConfigBuilder, Result};
use tracing::{info, warn};

/// Mirrors the agent's WebSocket feeds and prints connection status.
#[derive(Parser, Debug)]
#[command(name = "maicraft-monitor", version, about, long_about = None)]
struct Cli {
    /// WebSocket base URL (defaults to MAICRAFT_WS_BASE_URL or ws://localhost:20914)
    #[arg(long)]
    ws_url: Option<String>,

    /// Seconds between status lines
    #[arg(short, long, default_value_t = 5)]
    interval: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    common::init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut builder = LinkConfigBuilder::from_config(LinkConfig::from_env());
    if let Some(url) = cli.ws_url {
        builder = builder.ws_base_url(url);
    }

    let hub = Hub::new(builder.build()?)?;
    let connected = hub.connect_all().await?;
    info!(connected, "Initial connect finished");

    let mut tick = tokio::time::interval(Duration::from_secs(cli.interval.max(1)));

    loop {
        tokio::select! {
            _ = tick.tick() => report(&hub),
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    let closed = hub.disconnect_all();
    info!(closed, "Disconnected");
    Ok(())
}

fn report(hub: &Hub) {
    let status = hub.status();
    info!(
        connected = status.connection_count,
        total = status.total_endpoints,
        logs = hub.store().log_count(),
        "Link status"
    );

    for (endpoint, details) in &status.details {
        if !details.connected
            && let Some(error) = &details.last_error
        {
            warn!(%endpoint, errors = details.error_count, "{error}");
        }
    }
}
