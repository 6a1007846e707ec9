//! Document store seam used by the poller

use super::{fallback_images, tracks};
use crate::models::{FallbackImage, NewTrackPlay, TrackPlay};
use crate::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Track history and fallback catalog access
///
/// No transactions or batch writes: every call is one independent operation.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Record already stored for this playlist event, if any
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<TrackPlay>>;

    /// Most recently played stored track
    async fn most_recent(&self) -> Result<Option<TrackPlay>>;

    /// Persist a new record; `None` when the event id is already recorded
    async fn create(&self, track: &NewTrackPlay) -> Result<Option<TrackPlay>>;

    /// Placeholder image catalog ordered by id
    async fn load_fallback_catalog(&self) -> Result<Vec<FallbackImage>>;
}

/// `TrackStore` backed by the SQLite database
#[derive(Clone)]
pub struct SqliteTrackStore {
    pool: SqlitePool,
}

impl SqliteTrackStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TrackStore for SqliteTrackStore {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<TrackPlay>> {
        tracks::find_by_event_id(&self.pool, event_id).await
    }

    async fn most_recent(&self) -> Result<Option<TrackPlay>> {
        tracks::most_recent(&self.pool).await
    }

    async fn create(&self, track: &NewTrackPlay) -> Result<Option<TrackPlay>> {
        tracks::insert_track(&self.pool, track).await
    }

    async fn load_fallback_catalog(&self) -> Result<Vec<FallbackImage>> {
        fallback_images::load_catalog(&self.pool).await
    }
}
