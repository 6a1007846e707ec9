//! HTTP handlers

pub mod health;
pub mod tracks;

pub use health::health_routes;
pub use tracks::{record_play, top_tracks};
