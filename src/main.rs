//! Standalone webhook gateway.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nexus_webhook_gateway::{GatewayConfig, LogSubscriber, WebhookServer, WILDCARD};

#[derive(Parser)]
#[command(name = "nexus-webhook-gateway")]
#[command(about = "Receive, verify and fan out repository webhooks")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "NEXUS_WEBHOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    let server = WebhookServer::new(config);
    server.subscribe(WILDCARD, Arc::new(LogSubscriber)).await;

    let addr = server.start().await?;
    info!(%addr, "listening");

    shutdown_signal().await;
    info!("shutdown signal received");

    server.stop().await?;
    Ok(())
}
