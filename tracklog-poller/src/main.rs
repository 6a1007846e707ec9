//! tracklog-poller - Now-playing feed recorder
//!
//! Polls the station feed on a fixed interval and records each new track
//! with resolved album art (or a deterministic placeholder) in SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracklog_common::config::TomlConfig;
use tracklog_common::db::{fallback_images, init_database_pool, SqliteTrackStore};
use tracklog_poller::{ArtworkResolver, HttpPlaylistFeed, Poller, PollerSettings};

/// Command-line arguments for tracklog-poller
#[derive(Parser, Debug)]
#[command(name = "tracklog-poller")]
#[command(about = "Records now-playing tracks with album art")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "TRACKLOG_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "TRACKLOG_DATABASE")]
    database: Option<PathBuf>,

    /// Now-playing feed URL
    #[arg(long, env = "TRACKLOG_FEED_URL")]
    feed_url: Option<String>,

    /// Seconds between poll cycles
    #[arg(long, env = "TRACKLOG_INTERVAL_SECS")]
    interval_secs: Option<u64>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "TRACKLOG_LOG_LEVEL")]
    log_level: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Seed an empty fallback catalog from this URL prefix and exit
    #[arg(long, value_name = "URL_PREFIX")]
    seed_fallbacks: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = args.feed_url {
        config.poller.feed_url = url;
    }
    if let Some(secs) = args.interval_secs {
        config.poller.interval_secs = secs;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tracklog-poller v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let db_path = args.database.unwrap_or_else(|| config.database_path());
    info!("Database path: {}", db_path.display());
    let pool = init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    if let Some(prefix) = args.seed_fallbacks {
        let inserted = fallback_images::seed_fallback_catalog(&pool, &prefix)
            .await
            .context("Failed to seed fallback catalog")?;
        info!(inserted, "Fallback seeding finished");
        return Ok(());
    }

    let settings = PollerSettings::from(&config.poller);
    let feed = HttpPlaylistFeed::new(
        config.poller.feed_url.clone(),
        std::time::Duration::from_secs(config.poller.request_timeout_secs),
    )
    .context("Failed to build feed client")?;
    let resolver =
        ArtworkResolver::from_config(&config.poller).context("Failed to build artwork client")?;

    info!("Feed URL: {}", config.poller.feed_url);
    let poller = Poller::new(
        Arc::new(feed),
        Arc::new(SqliteTrackStore::new(pool)),
        resolver,
        settings,
    )
    .await
    .context("Failed to load fallback catalog")?;

    if args.once {
        let summary = poller.run_cycle().await.context("Poll cycle failed")?;
        info!(
            recorded = summary.recorded,
            already_recorded = summary.already_recorded,
            skipped_invalid = summary.skipped_invalid,
            failed = summary.failed,
            "Single cycle complete"
        );
        return Ok(());
    }

    tokio::select! {
        _ = poller.run() => {}
        _ = shutdown_signal() => {}
    }

    info!("Poller stopped");
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
