#![forbid(unsafe_code)]
//! Embercoin node binary: serves the HTTP API and gossips with peers.

use clap::Parser;
use embercoin::config::load_config;
use embercoin::node::Node;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ember-node", about = "Run an embercoin node")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the configured API port.
    #[arg(long)]
    port: Option<u16>,

    /// Additional bootstrap peers (host:port); may be repeated.
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Announce this node to its bootstrap peers on startup.
    #[arg(long)]
    announce: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.network.port = port;
    }
    config.network.bootstrap_peers.extend(args.peers);
    if args.announce {
        config.network.announce_on_start = true;
    }

    let node = Arc::new(Node::new(config));
    node.start().await
}
