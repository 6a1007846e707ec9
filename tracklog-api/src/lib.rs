//! tracklog-api library - HTTP access to the track history
//!
//! Records manual plays and serves play-count charts from the database the
//! poller writes to.

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/tracks-played/record-play", post(api::record_play))
        .route("/api/top-tracks", get(api::top_tracks))
        .merge(api::health_routes())
        .with_state(state)
}
