//! Fleetwire device protocol server binary.
//!
//! # Usage
//!
//! ```bash
//! fleetwire-server --bind 0.0.0.0:7878 --backlog 32 --log-level debug
//! ```

use std::sync::Arc;

use clap::Parser;
use fleetwire_proto::DecodedMessage;
use fleetwire_server::{
    BoxFuture, ConnectionContext, DeviceRegistry, ProtocolHandler, ProtocolServer, ServerConfig,
    TcpServer, TcpServerConfig, DEFAULT_BACKLOG,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Fleetwire device protocol server
#[derive(Parser, Debug)]
#[command(name = "fleetwire-server")]
#[command(about = "Fleetwire device protocol server over plain TCP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:7878")]
    bind: String,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: i32,

    /// Force-close a connection's prior registration on LOGIN replacement
    #[arg(long, default_value_t = false)]
    force_close_on_login_replacement: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Logs every received frame and every disconnect; sends nothing back.
///
/// Stands in for a real backend integration, which would typically parse
/// `message.raw` for COMMAND frames and drive `DeviceRegistry::send_to_device`
/// from elsewhere in response to its own events.
struct LoggingHandler;

impl ProtocolHandler for LoggingHandler {
    fn on_message(&self, ctx: ConnectionContext, message: DecodedMessage) -> BoxFuture<()> {
        tracing::info!(
            peer_addr = ?ctx.peer_addr,
            device_id = ?ctx.device_id,
            opcode = ?message.opcode,
            payload_len = message.raw.len(),
            "received frame"
        );
        Box::pin(async {})
    }

    fn on_disconnect(&self, ctx: ConnectionContext) -> BoxFuture<()> {
        tracing::info!(peer_addr = ?ctx.peer_addr, device_id = ?ctx.device_id, "connection closed");
        Box::pin(async {})
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    fleetwire_core::network_init();

    let config = ServerConfig {
        bind_addr: args.bind.parse()?,
        backlog: args.backlog,
        force_close_on_login_replacement: args.force_close_on_login_replacement,
    };

    tracing::info!("fleetwire server starting");

    let registry = Arc::new(DeviceRegistry::new());
    let protocol_server = Arc::new(ProtocolServer::new(
        registry,
        Arc::new(LoggingHandler),
        config.force_close_on_login_replacement,
    ));

    let tcp_config = TcpServerConfig { bind_addr: config.bind_addr, backlog: config.backlog };
    let mut tcp_server = TcpServer::bind(tcp_config, protocol_server.accept_callback())?;

    tracing::info!("listening on {}", tcp_server.local_addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    tcp_server.stop().await;

    Ok(())
}
