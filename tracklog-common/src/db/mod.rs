//! SQLite document store
//!
//! Holds the `tracks_played` history and the `player_fallback_images`
//! catalog. `TrackStore` is the seam the poller talks through.

pub mod fallback_images;
pub mod store;
pub mod tracks;

pub use store::{SqliteTrackStore, TrackStore};

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the database file and initialize tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database with tables initialized
///
/// Limited to one connection: every SQLite in-memory connection is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_fallback_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            logo TEXT NOT NULL,
            color TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks_played (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playlist_event_id TEXT,
            artist_name TEXT NOT NULL,
            track_name TEXT NOT NULL,
            album_name TEXT NOT NULL DEFAULT '',
            label_name TEXT NOT NULL DEFAULT '',
            album_art TEXT NOT NULL DEFAULT '',
            fallback_image_id INTEGER REFERENCES player_fallback_images(id) ON DELETE SET NULL,
            dj_name TEXT NOT NULL,
            show_name TEXT NOT NULL DEFAULT '',
            is_local INTEGER NOT NULL DEFAULT 0,
            played_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_played_playlist_event_id ON tracks_played (playlist_event_id)",
        "CREATE INDEX IF NOT EXISTS idx_tracks_played_artist_name ON tracks_played (artist_name)",
        "CREATE INDEX IF NOT EXISTS idx_tracks_played_track_name ON tracks_played (track_name)",
        "CREATE INDEX IF NOT EXISTS idx_tracks_played_dj_name ON tracks_played (dj_name)",
        "CREATE INDEX IF NOT EXISTS idx_tracks_played_played_at ON tracks_played (played_at)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database tables initialized (tracks_played, player_fallback_images)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        init_tables(&pool).await.expect("second init should succeed");

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('tracks_played', 'player_fallback_images')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 2);
    }
}
