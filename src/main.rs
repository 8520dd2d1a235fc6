//! # User Gateway - Main Entry Point
//!
//! Startup sequence:
//! 1. load and validate configuration (defaults, optional YAML file, environment)
//! 2. install the tracing subscriber
//! 3. connect to the user service; the channel is shared by every request
//! 4. serve until SIGINT/SIGTERM, then drain in-flight requests
//!
//! Any startup failure exits with a non-zero status.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

use user_gateway::gateway::server::shutdown_signal;
use user_gateway::observability::init_logging;
use user_gateway::{GatewayConfig, GatewayServer, GrpcConfig, GrpcIdentityClient};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet, so stderr gets it too
        eprintln!("user-gateway: {:#}", e);
        error!(error = %format!("{:#}", e), "Gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GatewayConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging).context("failed to initialize logging")?;

    info!("🚀 Starting user gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let grpc = GrpcConfig::from(&config.backend);
    let client = GrpcIdentityClient::connect(&grpc)
        .await
        .with_context(|| format!("failed to connect to user service at {}", grpc.endpoint))?;

    let server = GatewayServer::new(config, Arc::new(client)).context("invalid server configuration")?;
    server.serve(shutdown_signal()).await?;

    info!("✅ User gateway shutdown complete");
    Ok(())
}
