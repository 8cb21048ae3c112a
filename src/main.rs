//! Broker auth backend CLI
//!
//! Standalone HTTP backend for the broker's authentication plugin.

use anyhow::Result;
use broker_authz::server::{self, AppState};
use broker_authz::{BrokerAuthConfig, DecisionEngine};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// HTTP authentication backend for the device broker
#[derive(Parser, Debug)]
#[command(name = "broker-authz")]
#[command(version)]
#[command(about = "Authentication and authorization backend for the device broker", long_about = None)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long, env = "AUTH_LISTEN")]
    listen: Option<SocketAddr>,

    /// Shared secret for device password derivation, overrides the config file
    #[arg(long, env = "AUTH_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,

    /// Log every device identifier with its derived password at startup
    #[arg(long)]
    print_credentials: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting broker auth backend");

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        info!(path = %config_path.display(), "Loading configuration from file");
        BrokerAuthConfig::from_file(config_path)?
    } else {
        BrokerAuthConfig::default()
    };

    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(secret) = args.secret {
        config.devices.secret = Some(secret);
    }

    let engine = DecisionEngine::new(&config)?;

    info!(
        admin = %config.admin.username,
        device_prefix = %config.devices.prefix,
        fleet_size = engine.devices().fleet_size(),
        default_secret = engine.devices().uses_default_secret(),
        vhost = %config.vhost.name,
        topic_root = %config.topics.root,
        routing_key_style = ?config.topics.routing_key_style,
        "Decision engine initialized"
    );

    if args.print_credentials {
        for credential in engine.devices().fleet() {
            info!(
                device = %credential.device,
                password = %credential.password,
                routing_key = %engine.topics().device_routing_key(&credential.device),
                "Device credential"
            );
        }
    }

    server::serve(config.server.listen, AppState::new(engine)).await
}
