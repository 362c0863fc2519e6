//! Admission Cache - a UDP in-memory admission cache
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Parse configuration from arguments and environment variables
//! 3. Build the selected cache engine
//! 4. Bind the UDP socket and start the receiver and workers
//! 5. Handle graceful shutdown on SIGINT/SIGTERM

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admission_cache::{Config, UdpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admission_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Admission Cache Server");

    let config = Config::parse();
    let default_ttl = config.default_ttl();
    info!(
        listen = %config.listen,
        engine = %config.engine,
        default_ttl_secs = default_ttl.as_secs(),
        "Configuration loaded"
    );

    let engine = config.engine.build(default_ttl);
    let server = UdpServer::bind(&config.listen, engine.clone(), config.pipeline())
        .await
        .with_context(|| format!("cannot listen on {}", config.listen))?;
    let handle = server.start().context("cannot start UDP pipeline")?;
    info!("Server listening on udp://{}", handle.local_addr());

    shutdown_signal().await;
    handle.shutdown().await;

    let stats = engine.stats().await;
    match serde_json::to_string(&stats) {
        Ok(json) => info!(
            stats = %json,
            admission_rate = stats.admission_rate(),
            "Final cache statistics"
        ),
        Err(e) => error!(error = %e, "cannot serialize cache statistics"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
