//! Playlist poller
//!
//! One cycle fetches the now-playing feed and records every entry the
//! store has not seen yet, now-playing first and then recently-played in
//! feed order. Each new track gets album art from the resolver; when the
//! first pass fails the feed is fetched again and the fresh candidate URL
//! gets a shorter second pass; when that fails too a placeholder is picked
//! from the fallback catalog.
//!
//! Cycles run inline on a fixed interval, so two cycles never overlap. A
//! cycle that outlasts the interval delays the next tick.

use crate::artwork::{ArtworkQuery, ArtworkResolver};
use crate::fallback::select_fallback;
use crate::feed::{CurrentPlaylist, FeedError, FeedTrack, FeedTrackError, PlaylistFeed, PlayedTrack};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracklog_common::config::PollerConfig;
use tracklog_common::db::TrackStore;
use tracklog_common::models::{FallbackImage, NewTrackPlay};
use tracklog_common::time::now;

/// Timing and labelling knobs for the poller
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub first_pass_timeout: Duration,
    pub retry_timeout: Duration,
    pub show_name: String,
}

impl From<&PollerConfig> for PollerSettings {
    fn from(config: &PollerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            first_pass_timeout: Duration::from_millis(config.first_pass_timeout_ms),
            retry_timeout: Duration::from_millis(config.retry_timeout_ms),
            show_name: config.show_name.clone(),
        }
    }
}

/// Counts for one completed cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub recorded: usize,
    pub already_recorded: usize,
    pub skipped_invalid: usize,
    pub failed: usize,
}

enum TrackOutcome {
    Recorded,
    AlreadyRecorded,
    Invalid,
    Failed,
}

/// Artwork chosen for a new record
#[derive(Debug, Clone, PartialEq)]
struct ArtworkChoice {
    album_art: String,
    fallback_image_id: Option<i64>,
}

pub struct Poller {
    feed: Arc<dyn PlaylistFeed>,
    store: Arc<dyn TrackStore>,
    resolver: ArtworkResolver,
    catalog: Vec<FallbackImage>,
    settings: PollerSettings,
}

impl Poller {
    /// Build a poller, loading the fallback catalog once
    ///
    /// A catalog query failure is fatal. An empty catalog is not: tracks
    /// without resolved art are then stored with empty album art.
    pub async fn new(
        feed: Arc<dyn PlaylistFeed>,
        store: Arc<dyn TrackStore>,
        resolver: ArtworkResolver,
        settings: PollerSettings,
    ) -> tracklog_common::Result<Self> {
        let catalog = store.load_fallback_catalog().await?;
        if catalog.is_empty() {
            warn!("Fallback catalog is empty; unresolved tracks will have no album art");
        } else {
            info!(images = catalog.len(), "Loaded fallback catalog");
        }

        Ok(Self {
            feed,
            store,
            resolver,
            catalog,
            settings,
        })
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Poll forever; the first cycle runs immediately
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.settings.interval.as_secs(),
            "Playlist poller started"
        );

        loop {
            ticker.tick().await;
            let started = Instant::now();

            match self.run_cycle().await {
                Ok(summary) => {
                    if summary.recorded > 0 || summary.failed > 0 {
                        info!(
                            recorded = summary.recorded,
                            already_recorded = summary.already_recorded,
                            skipped_invalid = summary.skipped_invalid,
                            failed = summary.failed,
                            "Poll cycle complete"
                        );
                    } else {
                        debug!(already_recorded = summary.already_recorded, "No new tracks");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to fetch playlist feed"),
            }

            let elapsed = started.elapsed();
            if elapsed > self.settings.interval {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    interval_ms = self.settings.interval.as_millis() as u64,
                    "Poll cycle overran the interval"
                );
            }
        }
    }

    /// Fetch the feed once and record any new tracks
    pub async fn run_cycle(&self) -> Result<CycleSummary, FeedError> {
        let playlist = self.feed.fetch().await?;
        let fetched_at = now();
        let mut summary = CycleSummary::default();

        for entry in playlist.tracks() {
            match self.process_track(entry, fetched_at).await {
                TrackOutcome::Recorded => summary.recorded += 1,
                TrackOutcome::AlreadyRecorded => summary.already_recorded += 1,
                TrackOutcome::Invalid => summary.skipped_invalid += 1,
                TrackOutcome::Failed => summary.failed += 1,
            }
        }

        Ok(summary)
    }

    async fn process_track(
        &self,
        entry: Result<FeedTrack, FeedTrackError>,
        fetched_at: DateTime<Utc>,
    ) -> TrackOutcome {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(reason = %e, "Skipping undecodable feed track");
                return TrackOutcome::Invalid;
            }
        };

        let track = match entry.validate() {
            Ok(track) => track,
            Err(e) => {
                warn!(
                    event_id = ?entry.event_id(),
                    artist = ?entry.artist,
                    track = ?entry.track,
                    reason = %e,
                    "Skipping invalid feed track"
                );
                return TrackOutcome::Invalid;
            }
        };

        match self.store.find_by_event_id(&track.event_id).await {
            Ok(Some(_)) => return TrackOutcome::AlreadyRecorded,
            Ok(None) => {}
            Err(e) => {
                error!(
                    event_id = %track.event_id,
                    artist = %track.artist,
                    track = %track.track,
                    error = %e,
                    "Failed to check for existing track"
                );
                return TrackOutcome::Failed;
            }
        }

        info!(
            event_id = %track.event_id,
            artist = %track.artist,
            track = %track.track,
            album = %track.album,
            "New track"
        );

        let artwork = self.choose_artwork(&track).await;
        let record = NewTrackPlay {
            playlist_event_id: Some(track.event_id.clone()),
            artist_name: track.artist.clone(),
            track_name: track.track.clone(),
            album_name: track.album.clone(),
            label_name: track.label.clone(),
            album_art: artwork.album_art,
            fallback_image_id: artwork.fallback_image_id,
            dj_name: track.dj.clone(),
            show_name: self.settings.show_name.clone(),
            is_local: track.is_local,
            played_at: track.played_at.unwrap_or(fetched_at),
        };

        match self.store.create(&record).await {
            Ok(Some(saved)) => {
                info!(
                    id = saved.id,
                    event_id = %track.event_id,
                    artist = %saved.artist_name,
                    track = %saved.track_name,
                    has_art = !saved.album_art.is_empty(),
                    fallback_image_id = ?saved.fallback_image_id,
                    "Recorded track"
                );
                TrackOutcome::Recorded
            }
            Ok(None) => {
                debug!(event_id = %track.event_id, "Track recorded concurrently, skipping");
                TrackOutcome::AlreadyRecorded
            }
            Err(e) => {
                error!(
                    event_id = %track.event_id,
                    artist = %track.artist,
                    track = %track.track,
                    error = %e,
                    "Failed to record track"
                );
                TrackOutcome::Failed
            }
        }
    }

    /// Resolved art, then a retry against a fresh feed, then a placeholder
    async fn choose_artwork(&self, track: &PlayedTrack) -> ArtworkChoice {
        let query = ArtworkQuery::new(&track.artist, &track.album)
            .with_direct_url(track.artwork_candidate.clone());

        if let Some(url) = self
            .resolver
            .resolve(&query, self.settings.first_pass_timeout)
            .await
        {
            return ArtworkChoice {
                album_art: url,
                fallback_image_id: None,
            };
        }

        debug!(event_id = %track.event_id, "First artwork pass failed, retrying with fresh feed");
        let fresh_candidate = match self.feed.fetch().await {
            Ok(playlist) => fresh_candidate(&playlist, track),
            Err(e) => {
                warn!(event_id = %track.event_id, error = %e, "Feed re-fetch failed, retrying with original candidate");
                track.artwork_candidate.clone()
            }
        };

        let retry = ArtworkQuery::new(&track.artist, &track.album).with_direct_url(fresh_candidate);
        if let Some(url) = self
            .resolver
            .resolve(&retry, self.settings.retry_timeout)
            .await
        {
            return ArtworkChoice {
                album_art: url,
                fallback_image_id: None,
            };
        }

        let previous = self.previous_fallback().await;
        match select_fallback(&track.artist, &track.album, &self.catalog, previous) {
            Some(image) => {
                info!(
                    event_id = %track.event_id,
                    image_id = image.id,
                    logo = %image.logo,
                    color = %image.color,
                    "Using fallback image"
                );
                ArtworkChoice {
                    album_art: image.url.clone(),
                    fallback_image_id: Some(image.id),
                }
            }
            None => ArtworkChoice {
                album_art: String::new(),
                fallback_image_id: None,
            },
        }
    }

    /// Placeholder of the most recently played stored track
    async fn previous_fallback(&self) -> Option<&FallbackImage> {
        let recent = match self.store.most_recent().await {
            Ok(recent) => recent?,
            Err(e) => {
                warn!(error = %e, "Failed to read most recent track");
                return None;
            }
        };
        let id = recent.fallback_image_id?;
        self.catalog.iter().find(|image| image.id == id)
    }
}

/// Candidate URL for the same event in a re-fetched feed
///
/// Falls back to the original candidate when the event has dropped out of
/// the feed.
fn fresh_candidate(playlist: &CurrentPlaylist, track: &PlayedTrack) -> Option<String> {
    match playlist.find_event(&track.event_id) {
        Some(entry) => entry.artwork_candidate(),
        None => track.artwork_candidate.clone(),
    }
}
