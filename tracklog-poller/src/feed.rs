//! Now-playing feed client
//!
//! The station feed is JSON shaped as
//! `{ "now_playing": Track, "recently_played": [Track] }`. Tracks are
//! decoded one at a time, so a single mistyped entry is skipped without
//! losing the rest of the payload. Every field of a track is optional on
//! the wire; `FeedTrack::validate` turns one into a `PlayedTrack` or
//! explains why it has to be skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tracklog_common::models::UNKNOWN_DJ;
use tracklog_common::time::{parse_offset_timestamp, parse_timestamp};

/// One feed payload, tracks still undecoded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentPlaylist {
    pub now_playing: Option<Value>,
    #[serde(default)]
    pub recently_played: Option<Vec<Value>>,
}

impl CurrentPlaylist {
    /// Now-playing first, then recently-played in feed order
    pub fn tracks(&self) -> impl Iterator<Item = Result<FeedTrack, FeedTrackError>> + '_ {
        self.now_playing
            .iter()
            .chain(self.recently_played.iter().flatten())
            .map(FeedTrack::decode)
    }

    /// Entry for a playlist event, if the payload still carries it
    pub fn find_event(&self, event_id: &str) -> Option<FeedTrack> {
        self.tracks()
            .filter_map(Result::ok)
            .find(|track| track.event_id().as_deref() == Some(event_id))
    }
}

/// Playlist event id, sent as either a string or a number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeedEventId {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for FeedEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedEventId::Text(s) => f.write_str(s),
            FeedEventId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// last.fm image URLs captured when the track was last seen
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastfmUrls {
    pub large_image: Option<String>,
    pub med_image: Option<String>,
    pub sm_image: Option<String>,
}

/// A track exactly as the feed sent it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedTrack {
    pub id: Option<FeedEventId>,
    pub artist: Option<String>,
    pub track: Option<String>,
    pub release: Option<String>,
    pub label: Option<String>,
    pub dj: Option<String>,
    pub artist_is_local: Option<bool>,
    pub played_at_gmt: Option<String>,
    pub played_at_local: Option<String>,
    pub lastfm_urls: Option<LastfmUrls>,
}

/// Why a feed track cannot be recorded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedTrackError {
    #[error("missing playlist event id")]
    MissingEventId,

    #[error("missing artist name")]
    MissingArtist,

    #[error("missing track name")]
    MissingTrack,

    /// A field had the wrong JSON type
    #[error("malformed track: {0}")]
    Malformed(String),
}

/// A validated feed track
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedTrack {
    pub event_id: String,
    pub artist: String,
    pub track: String,
    pub album: String,
    pub label: String,
    pub dj: String,
    pub is_local: bool,
    /// Upstream play time, when the feed supplied a usable one
    pub played_at: Option<DateTime<Utc>>,
    /// Best-quality feed image URL
    pub artwork_candidate: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl FeedTrack {
    /// Decode one feed entry
    pub fn decode(value: &Value) -> Result<Self, FeedTrackError> {
        FeedTrack::deserialize(value).map_err(|e| FeedTrackError::Malformed(e.to_string()))
    }

    pub fn event_id(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| id.to_string())
            .filter(|id| !id.trim().is_empty())
    }

    /// Large image if present, else medium
    pub fn artwork_candidate(&self) -> Option<String> {
        let urls = self.lastfm_urls.as_ref()?;
        non_blank(&urls.large_image).or_else(|| non_blank(&urls.med_image))
    }

    /// Local time with an explicit offset, else GMT, else nothing
    pub fn upstream_played_at(&self) -> Option<DateTime<Utc>> {
        self.played_at_local
            .as_deref()
            .and_then(parse_offset_timestamp)
            .or_else(|| self.played_at_gmt.as_deref().and_then(parse_timestamp))
    }

    pub fn validate(&self) -> Result<PlayedTrack, FeedTrackError> {
        let event_id = self.event_id().ok_or(FeedTrackError::MissingEventId)?;
        let artist = non_blank(&self.artist).ok_or(FeedTrackError::MissingArtist)?;
        let track = non_blank(&self.track).ok_or(FeedTrackError::MissingTrack)?;

        Ok(PlayedTrack {
            event_id,
            artist,
            track,
            album: non_blank(&self.release).unwrap_or_default(),
            label: non_blank(&self.label).unwrap_or_default(),
            dj: non_blank(&self.dj).unwrap_or_else(|| UNKNOWN_DJ.to_string()),
            is_local: self.artist_is_local.unwrap_or(false),
            played_at: self.upstream_played_at(),
            artwork_candidate: self.artwork_candidate(),
        })
    }
}

/// Feed fetch failures
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(StatusCode),
}

/// Source of now-playing payloads
#[async_trait]
pub trait PlaylistFeed: Send + Sync {
    async fn fetch(&self) -> Result<CurrentPlaylist, FeedError>;
}

/// `PlaylistFeed` over HTTP GET
pub struct HttpPlaylistFeed {
    client: Client,
    url: String,
}

impl HttpPlaylistFeed {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PlaylistFeed for HttpPlaylistFeed {
    async fn fetch(&self) -> Result<CurrentPlaylist, FeedError> {
        debug!(url = %self.url, "Fetching current playlist");
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}
