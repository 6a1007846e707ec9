//! tracklog-api - HTTP service over the track history
//!
//! Serves the record-play and top-tracks endpoints plus a health check.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracklog_api::{build_router, AppState};
use tracklog_common::config::TomlConfig;
use tracklog_common::db::init_database_pool;

/// Command-line arguments for tracklog-api
#[derive(Parser, Debug)]
#[command(name = "tracklog-api")]
#[command(about = "HTTP service for the tracklog track history")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "TRACKLOG_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "TRACKLOG_DATABASE")]
    database: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "TRACKLOG_BIND_ADDR")]
    bind: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "TRACKLOG_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("{},tower_http=debug", config.logging.level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tracklog-api v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let db_path = args.database.unwrap_or_else(|| config.database_path());
    info!("Database path: {}", db_path.display());
    let pool = init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let app = build_router(AppState::new(pool)).layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.api.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("tracklog-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
