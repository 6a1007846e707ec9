//! Track-play endpoints
//!
//! - `POST /api/tracks-played/record-play`: record a play reported by hand.
//!   A second report of the same artist and track within three minutes is
//!   treated as a correction of the first.
//! - `GET /api/top-tracks`: play counts per track over a time range.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use tracklog_common::db::tracks;
use tracklog_common::models::{NewTrackPlay, TrackCorrection, TrackPlay};
use tracklog_common::time::now;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Window in which a repeat report corrects the earlier play
pub const CORRECTION_WINDOW_SECS: i64 = 180;

/// Label reported when a play has none
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPlayRequest {
    pub playlist_event_id: Option<String>,
    pub artist_name: Option<String>,
    pub track_name: Option<String>,
    pub album_name: Option<String>,
    pub label_name: Option<String>,
    pub album_art: Option<String>,
    pub dj_name: Option<String>,
    pub show_name: Option<String>,
    pub is_local: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct RecordPlayResponse {
    pub success: bool,
    pub action: RecordAction,
    pub track: TrackPlay,
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// POST /api/tracks-played/record-play
pub async fn record_play(
    State(state): State<AppState>,
    Json(request): Json<RecordPlayRequest>,
) -> ApiResult<Json<RecordPlayResponse>> {
    let (artist, track, dj) = match (
        required(&request.artist_name),
        required(&request.track_name),
        required(&request.dj_name),
    ) {
        (Some(artist), Some(track), Some(dj)) => (artist, track, dj),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing required fields: artistName, trackName, djName".to_string(),
            ))
        }
    };

    let playlist_event_id = required(&request.playlist_event_id);
    let played_at = now();
    let window_start = played_at - Duration::seconds(CORRECTION_WINDOW_SECS);

    if let Some(existing) = tracks::find_recent_play(&state.db, &artist, &track, &window_start).await? {
        let correction = TrackCorrection {
            playlist_event_id: playlist_event_id.clone(),
            album_name: request.album_name,
            label_name: request.label_name,
            album_art: request.album_art,
            dj_name: Some(dj),
            show_name: request.show_name,
            is_local: request.is_local,
        };
        let updated = tracks::apply_correction(&state.db, existing.id, &played_at, &correction).await?;
        info!(id = updated.id, artist = %artist, track = %track, "Corrected recent play");

        return Ok(Json(RecordPlayResponse {
            success: true,
            action: RecordAction::Updated,
            track: updated,
        }));
    }

    let new_track = NewTrackPlay {
        playlist_event_id,
        artist_name: artist,
        track_name: track,
        album_name: request.album_name.unwrap_or_default(),
        label_name: request.label_name.unwrap_or_default(),
        album_art: request.album_art.unwrap_or_default(),
        fallback_image_id: None,
        dj_name: dj,
        show_name: request.show_name.unwrap_or_default(),
        is_local: request.is_local.unwrap_or(false),
        played_at,
    };

    let created = tracks::insert_track(&state.db, &new_track)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!(
                "Playlist event {} is already recorded",
                new_track.playlist_event_id.as_deref().unwrap_or_default()
            ))
        })?;
    info!(id = created.id, artist = %created.artist_name, track = %created.track_name, "Recorded play");

    Ok(Json(RecordPlayResponse {
        success: true,
        action: RecordAction::Created,
        track: created,
    }))
}

/// Chart window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Week,
    Month,
    YearToDate,
    Year,
}

impl TimeRange {
    /// Parse a query value; anything unrecognised means a week
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("month") => TimeRange::Month,
            Some("ytd") => TimeRange::YearToDate,
            Some("year") => TimeRange::Year,
            _ => TimeRange::Week,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::YearToDate => "ytd",
            TimeRange::Year => "year",
        }
    }

    /// First instant covered by the range ending at `end`
    pub fn start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeRange::Week => end - Duration::days(7),
            TimeRange::Month => end
                .checked_sub_months(Months::new(1))
                .unwrap_or(end - Duration::days(30)),
            TimeRange::YearToDate => Utc
                .with_ymd_and_hms(end.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(end),
            TimeRange::Year => end
                .checked_sub_months(Months::new(12))
                .unwrap_or(end - Duration::days(365)),
        }
    }
}

/// Chart length when `limit` is absent or has no leading digits
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTracksQuery {
    pub time_range: Option<String>,
    pub limit: Option<String>,
}

/// Leading decimal digits of `limit` ("25", " 5 tracks"), else the default
pub fn parse_limit(value: Option<&str>) -> usize {
    let digits: String = value
        .unwrap_or_default()
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(DEFAULT_LIMIT)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTrack {
    pub song_name: String,
    pub artist_name: String,
    pub record_company: String,
    pub play_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTracksResponse {
    pub success: bool,
    pub tracks: Vec<TopTrack>,
    pub time_range: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Count plays per track, most played first
///
/// Tracks are keyed case-insensitively on track and artist name; the first
/// play seen supplies the reported spelling and label. Equal counts keep
/// first-seen order.
pub fn aggregate_top_tracks(plays: &[TrackPlay], limit: usize) -> Vec<TopTrack> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut chart: Vec<TopTrack> = Vec::new();

    for play in plays {
        let key = format!("{}|||{}", play.track_name, play.artist_name).to_lowercase();
        match index.get(&key) {
            Some(&pos) => chart[pos].play_count += 1,
            None => {
                index.insert(key, chart.len());
                let label = play.label_name.trim();
                chart.push(TopTrack {
                    song_name: play.track_name.clone(),
                    artist_name: play.artist_name.clone(),
                    record_company: if label.is_empty() {
                        UNKNOWN_LABEL.to_string()
                    } else {
                        label.to_string()
                    },
                    play_count: 1,
                });
            }
        }
    }

    chart.sort_by(|a, b| b.play_count.cmp(&a.play_count));
    chart.truncate(limit);
    chart
}

/// GET /api/top-tracks?timeRange=week|month|ytd|year&limit=N
pub async fn top_tracks(
    State(state): State<AppState>,
    Query(query): Query<TopTracksQuery>,
) -> ApiResult<Json<TopTracksResponse>> {
    let range = TimeRange::parse(query.time_range.as_deref());
    let end = now();
    let start = range.start(end);

    let plays = tracks::plays_since(&state.db, &start).await?;
    let tracks = aggregate_top_tracks(&plays, parse_limit(query.limit.as_deref()));

    Ok(Json(TopTracksResponse {
        success: true,
        tracks,
        time_range: range.as_str().to_string(),
        start_date: start,
        end_date: end,
    }))
}
