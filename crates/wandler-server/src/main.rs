// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler — document conversion service
//
// Entry point. Loads configuration, initialises logging and services, starts
// the artifact sweeper and serves the HTTP API until interrupted.

use anyhow::Context;
use tokio::signal;
use wandler_core::AppConfig;
use wandler_server::{AppServices, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let address = config.bind_address();
    let auto_sweep = config.auto_start_sweeper;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Wandler starting");
    tracing::info!(
        storage = %config.storage_dir.display(),
        ttl_hours = config.artifact_ttl_hours,
        "artifact storage configured"
    );

    let services = AppServices::init(config).context("initialising services")?;
    if auto_sweep {
        services
            .start_sweeper()
            .await
            .context("starting artifact sweeper")?;
    }

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(%address, "listening");

    axum::serve(listener, router(services.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.stop_sweeper().await?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
