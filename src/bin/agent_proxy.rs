//! REST proxy that starts and stops the Maicraft agent.
//!
//! Usage:
//!   maicraft-proxy
//!   maicraft-proxy --port 25106 --host 0.0.0.0

mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use maicraft_link::Result;
use maicraft_link::agent::{AgentSupervisor, DEFAULT_PROXY_PORT, serve};

/// Exposes agent start/stop/status over HTTP.
#[derive(Parser, Debug)]
#[command(name = "maicraft-proxy", version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PROXY_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

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
    let addr = SocketAddr::new(cli.host, cli.port);
    println!("Agent proxy on http://{addr}");
    serve(addr, Arc::new(AgentSupervisor::new())).await
}
