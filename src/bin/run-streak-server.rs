// ABOUTME: HTTP server binary for webhook ingestion, OAuth, health, and admin endpoints
// ABOUTME: Connects the state store, resolves webhook secrets, and runs the optional poller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Run Streak Server Binary
//!
//! Loads configuration from the environment, then serves the webhook, OAuth,
//! health, and admin routes until SIGINT or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use run_streak::{
    config::ServerConfig,
    ingest::Poller,
    logging,
    resources::ServerResources,
    routes,
    store::factory,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use streak_core::SystemClock;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "run-streak-server")]
#[command(about = "Running streak tracker - Strava webhook ingestion and activity descriptions")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the poll interval in seconds (0 disables polling)
    #[arg(long)]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(interval) = args.poll_interval {
        config.polling.interval_secs = interval;
    }

    info!("Starting run streak server");
    info!("{}", config.summary());

    let store = factory::connect(&config.store).await;
    info!(backend = store.backend_name(), "State store ready");

    let polling = config.polling.clone();
    let http_port = config.http_port;
    let resources = Arc::new(
        ServerResources::build(config, store, Arc::new(SystemClock))
            .await
            .context("Failed to initialize server resources")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = polling.enabled().then(|| {
        let poller = Poller::new(resources.ingestor.clone(), polling.lookback_hours);
        tokio::spawn(poller.run(Duration::from_secs(polling.interval_secs), shutdown_rx))
    });

    display_available_endpoints(&resources.config.base_url);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {addr}");

    let app = routes::router(resources);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
        return Err(e.into());
    }

    shutdown_tx.send_replace(true);
    if let Some(handle) = poller_handle {
        let grace = Duration::from_secs(run_streak::constants::timeouts::SHUTDOWN_GRACE_SECS);
        if tokio::time::timeout(grace, handle).await.is_err() {
            error!("Poller did not stop within the shutdown grace period");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

#[allow(clippy::cognitive_complexity)]
fn display_available_endpoints(base_url: &str) {
    let base = base_url.trim_end_matches('/');
    info!("=== Available Endpoints ===");
    info!("   Health:            GET  {base}/health");
    info!("   Readiness:         GET  {base}/ready");
    info!("   Webhook:           GET|POST {base}/webhook");
    info!("   Connect Strava:    GET  {base}/auth/strava");
    info!("   Status:            GET  {base}/api/status");
    info!("   Manual edit:       POST {base}/api/streak, {base}/api/stats");
    info!("   Process activity:  POST {base}/api/activities/{{id}}/process");
    info!("   Subscriptions:     GET|POST {base}/api/webhook/subscriptions");
    info!("=== End of Endpoint List ===");
}
