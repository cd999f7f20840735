//! Fleet Telemetry Server
//!
//! Polls the configured telemetry source and serves the fleet snapshot over
//! a REST API

use anyhow::{Context, Result};
use clap::Parser;
use fleet_server::config::ServerConfig;
use fleet_server::{api, scheduler::PollingScheduler, state};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "fleet-server", version, about = "Fleet telemetry aggregation server")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file (e.g. 127.0.0.1:9100)
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting Fleet Telemetry Server");

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    config.validate().context("Invalid configuration")?;

    info!("Using {} telemetry source", config.source.kind());
    let setup = config
        .source
        .build(&config.engine)
        .context("Failed to set up telemetry source")?;

    // Start polling scheduler in background
    let scheduler = PollingScheduler::new(&config.engine, setup.source);
    let state = state::AppState::new(scheduler.handle(), setup.push);
    let cancel = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

    // Build the router
    let app = api::create_router(state);

    // Start server
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task panicked: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => {
                    error!("Failed to listen for shutdown signal: {}", e);
                    cancel.cancelled().await;
                }
            }
        }
        _ = cancel.cancelled() => {}
    }
}
