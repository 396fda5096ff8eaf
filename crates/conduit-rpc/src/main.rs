//! Conduit RPC Server - hosts the demo `Hello` service over HTTP.

use anyhow::Result;
use clap::Parser;
use conduit_core::ProtocolConfig;
use conduit_rpc::{greeter, start_server, ServerConfig};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "conduit-rpc")]
#[command(about = "HTTP host for Conduit remote interfaces")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Path the invocation endpoint is served at
    #[arg(long, default_value = ProtocolConfig::RPC_PATH)]
    path: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    info!("Starting Conduit RPC Server");

    let engine = Arc::new(greeter::build_engine()?);
    let addr = start_server(engine, &args.host, args.port, &args.path).await?;

    // Print port for the parent process to read (intentional stdout)
    println!("CONDUIT_PORT={}", addr.port());

    info!("Serving example.Hello at http://{}{}", addr, args.path);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
