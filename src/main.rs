//! Server binary: resolve configuration, wire up logging, run the listener.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::{info, Level};

use ws_packet_server::config::NetworkConfig;
use ws_packet_server::error::{ProtocolError, Result};
use ws_packet_server::service::server::WsServer;
use ws_packet_server::utils::logging;

/// Command-line arguments. CLI values take precedence over the
/// configuration file.
#[derive(Parser, Debug)]
#[command(name = "ws-packet-server")]
#[command(about = "WebSocket binary packet protocol server", long_about = None)]
struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (e.g. 0.0.0.0:6502)
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => NetworkConfig::from_file(path)?,
        None => NetworkConfig::from_env()?,
    };

    if let Some(listen) = args.listen {
        config.server.address = listen;
    }

    if let Some(level) = args.log_level {
        config.logging.log_level = Level::from_str(&level)
            .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
    }

    logging::init(&config.logging);

    info!(
        address = %config.server.address,
        max_connections = config.server.max_connections,
        max_message_size = config.transport.max_message_size,
        "starting ws-packet-server"
    );

    WsServer::bind(config).await?.run().await
}
