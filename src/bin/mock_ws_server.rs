//! Mock Maicraft WebSocket server.
//!
//! Usage:
//!   maicraft-mock
//!   maicraft-mock --port 8000 --debug

mod common;

use clap::Parser;
use maicraft_link::Result;
use maicraft_link::mock::{DEFAULT_MOCK_PORT, MockServer};

/// Serves mock log, player and world feeds on localhost.
#[derive(Parser, Debug)]
#[command(name = "maicraft-mock", version, about, long_about = None)]
struct Cli {
    /// Port to listen on (0 for random)
    #[arg(short, long, default_value_t = DEFAULT_MOCK_PORT)]
    port: u16,

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
    let handle = MockServer::bind(cli.port).await?.spawn();

    println!("Mock WebSocket server on {}", handle.ws_url(""));
    println!("Log feed:    {}", handle.ws_url("/ws/logs"));
    println!("Player feed: {}", handle.ws_url("/ws/game/player"));
    println!("World feed:  {}", handle.ws_url("/ws/game/world"));
    println!("Press Ctrl+C to stop...");

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    Ok(())
}
