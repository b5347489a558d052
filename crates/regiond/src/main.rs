//! regiond — serves one region's instance.
//!
//! # Usage
//!
//! ```text
//! VERSION=v2 REGION=region-us-west FAILURE_RATE=0.2 regiond --port 8080
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use regiond::{ServiceConfig, build_router};

#[derive(Parser)]
#[command(name = "regiond", about = "regionroll region service")]
struct Cli {
    /// Version this instance reports.
    #[arg(long = "service-version", env = "VERSION", default_value = "v1")]
    service_version: String,

    /// Region label this instance reports.
    #[arg(long, env = "REGION", default_value = "unknown")]
    region: String,

    /// Probability (0.0-1.0) that a health check fails.
    #[arg(long, env = "FAILURE_RATE", default_value_t = 0.0)]
    failure_rate: f64,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::new(cli.service_version, cli.region, cli.failure_rate);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!(
        %addr,
        version = %config.version,
        region = %config.region,
        failure_rate = config.failure_rate,
        "region service starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("region service stopped");
    Ok(())
}
