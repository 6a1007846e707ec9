//! Track-play database operations

use crate::models::{NewTrackPlay, TrackCorrection, TrackPlay};
use crate::time::{format_timestamp, now, parse_timestamp};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = r#"
    SELECT id, playlist_event_id, artist_name, track_name, album_name, label_name,
           album_art, fallback_image_id, dj_name, show_name, is_local,
           played_at, created_at, updated_at
    FROM tracks_played
"#;

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    parse_timestamp(&raw)
        .ok_or_else(|| Error::InvalidInput(format!("Bad {} timestamp: {}", column, raw)))
}

fn track_from_row(row: &SqliteRow) -> Result<TrackPlay> {
    Ok(TrackPlay {
        id: row.get("id"),
        playlist_event_id: row.get("playlist_event_id"),
        artist_name: row.get("artist_name"),
        track_name: row.get("track_name"),
        album_name: row.get("album_name"),
        label_name: row.get("label_name"),
        album_art: row.get("album_art"),
        fallback_image_id: row.get("fallback_image_id"),
        dj_name: row.get("dj_name"),
        show_name: row.get("show_name"),
        is_local: row.get::<i64, _>("is_local") != 0,
        played_at: timestamp_column(row, "played_at")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

/// Load a track by row id
pub async fn load_track(pool: &SqlitePool, id: i64) -> Result<Option<TrackPlay>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Insert a track unless its playlist event id is already recorded
///
/// Returns `None` when the natural key already exists.
pub async fn insert_track(pool: &SqlitePool, track: &NewTrackPlay) -> Result<Option<TrackPlay>> {
    let stamp = format_timestamp(&now());

    let result = sqlx::query(
        r#"
        INSERT INTO tracks_played (
            playlist_event_id, artist_name, track_name, album_name, label_name,
            album_art, fallback_image_id, dj_name, show_name, is_local,
            played_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(playlist_event_id) DO NOTHING
        "#,
    )
    .bind(&track.playlist_event_id)
    .bind(&track.artist_name)
    .bind(&track.track_name)
    .bind(&track.album_name)
    .bind(&track.label_name)
    .bind(&track.album_art)
    .bind(track.fallback_image_id)
    .bind(&track.dj_name)
    .bind(&track.show_name)
    .bind(track.is_local as i64)
    .bind(format_timestamp(&track.played_at))
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    load_track(pool, result.last_insert_rowid()).await
}

/// Find the record for a playlist event
pub async fn find_by_event_id(pool: &SqlitePool, event_id: &str) -> Result<Option<TrackPlay>> {
    let row = sqlx::query(&format!("{} WHERE playlist_event_id = ? LIMIT 1", SELECT_COLUMNS))
        .bind(event_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Most recently played track
pub async fn most_recent(pool: &SqlitePool) -> Result<Option<TrackPlay>> {
    let row = sqlx::query(&format!(
        "{} ORDER BY played_at DESC, id DESC LIMIT 1",
        SELECT_COLUMNS
    ))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Latest play of the same artist and track after `since`
pub async fn find_recent_play(
    pool: &SqlitePool,
    artist_name: &str,
    track_name: &str,
    since: &DateTime<Utc>,
) -> Result<Option<TrackPlay>> {
    let row = sqlx::query(&format!(
        "{} WHERE artist_name = ? AND track_name = ? AND played_at > ? ORDER BY played_at DESC LIMIT 1",
        SELECT_COLUMNS
    ))
    .bind(artist_name)
    .bind(track_name)
    .bind(format_timestamp(since))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Move a play to a new time and overwrite the supplied descriptive fields
pub async fn apply_correction(
    pool: &SqlitePool,
    id: i64,
    played_at: &DateTime<Utc>,
    correction: &TrackCorrection,
) -> Result<TrackPlay> {
    let result = sqlx::query(
        r#"
        UPDATE tracks_played SET
            played_at = ?,
            playlist_event_id = COALESCE(?, playlist_event_id),
            album_name = COALESCE(?, album_name),
            label_name = COALESCE(?, label_name),
            album_art = COALESCE(?, album_art),
            dj_name = COALESCE(?, dj_name),
            show_name = COALESCE(?, show_name),
            is_local = COALESCE(?, is_local),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(format_timestamp(played_at))
    .bind(&correction.playlist_event_id)
    .bind(&correction.album_name)
    .bind(&correction.label_name)
    .bind(&correction.album_art)
    .bind(&correction.dj_name)
    .bind(&correction.show_name)
    .bind(correction.is_local.map(|local| local as i64))
    .bind(format_timestamp(&now()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Track play {}", id)));
    }

    load_track(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Track play {}", id)))
}

/// Every play at or after `since`, oldest first
pub async fn plays_since(pool: &SqlitePool, since: &DateTime<Utc>) -> Result<Vec<TrackPlay>> {
    let rows = sqlx::query(&format!(
        "{} WHERE played_at >= ? ORDER BY played_at ASC, id ASC",
        SELECT_COLUMNS
    ))
    .bind(format_timestamp(since))
    .fetch_all(pool)
    .await?;

    rows.iter().map(track_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use chrono::Duration;

    fn new_track(event_id: &str, artist: &str, played_at: DateTime<Utc>) -> NewTrackPlay {
        NewTrackPlay {
            playlist_event_id: Some(event_id.to_string()),
            artist_name: artist.to_string(),
            track_name: "Heavy Metal Drummer".to_string(),
            album_name: "Yankee Hotel Foxtrot".to_string(),
            label_name: "Nonesuch".to_string(),
            album_art: String::new(),
            fallback_image_id: None,
            dj_name: "Kevin".to_string(),
            show_name: "Live".to_string(),
            is_local: true,
            played_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_event_id() {
        let pool = connect_in_memory().await.unwrap();
        let inserted = insert_track(&pool, &new_track("e1", "Wilco", now()))
            .await
            .unwrap()
            .expect("first insert should create a row");

        let found = find_by_event_id(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(found, inserted);
        assert!(found.is_local);
        assert!(find_by_event_id(&pool, "e2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_event_id_is_ignored() {
        let pool = connect_in_memory().await.unwrap();
        insert_track(&pool, &new_track("e1", "Wilco", now())).await.unwrap();
        let second = insert_track(&pool, &new_track("e1", "Someone Else", now()))
            .await
            .unwrap();
        assert!(second.is_none());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks_played")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let kept = find_by_event_id(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(kept.artist_name, "Wilco");
    }

    #[tokio::test]
    async fn test_tracks_without_event_id_do_not_conflict() {
        let pool = connect_in_memory().await.unwrap();
        let mut track = new_track("unused", "Wilco", now());
        track.playlist_event_id = None;

        assert!(insert_track(&pool, &track).await.unwrap().is_some());
        assert!(insert_track(&pool, &track).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_most_recent_orders_by_played_at() {
        let pool = connect_in_memory().await.unwrap();
        let t0 = now();
        insert_track(&pool, &new_track("late", "B", t0)).await.unwrap();
        insert_track(&pool, &new_track("early", "A", t0 - Duration::minutes(10)))
            .await
            .unwrap();

        let latest = most_recent(&pool).await.unwrap().unwrap();
        assert_eq!(latest.playlist_event_id.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_find_recent_play_window() {
        let pool = connect_in_memory().await.unwrap();
        let t0 = now();
        insert_track(&pool, &new_track("old", "Wilco", t0 - Duration::minutes(5)))
            .await
            .unwrap();

        let since = t0 - Duration::minutes(3);
        assert!(find_recent_play(&pool, "Wilco", "Heavy Metal Drummer", &since)
            .await
            .unwrap()
            .is_none());

        insert_track(&pool, &new_track("new", "Wilco", t0 - Duration::minutes(1)))
            .await
            .unwrap();
        let hit = find_recent_play(&pool, "Wilco", "Heavy Metal Drummer", &since)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.playlist_event_id.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_apply_correction_keeps_unset_fields() {
        let pool = connect_in_memory().await.unwrap();
        let track = insert_track(&pool, &new_track("e1", "Wilco", now() - Duration::minutes(2)))
            .await
            .unwrap()
            .unwrap();

        let moved_to = now();
        let correction = TrackCorrection {
            album_name: Some("Sky Blue Sky".to_string()),
            is_local: Some(false),
            ..Default::default()
        };
        let updated = apply_correction(&pool, track.id, &moved_to, &correction)
            .await
            .unwrap();

        assert_eq!(updated.album_name, "Sky Blue Sky");
        assert!(!updated.is_local);
        assert_eq!(updated.label_name, "Nonesuch");
        assert_eq!(updated.played_at.timestamp_millis(), moved_to.timestamp_millis());
    }

    #[tokio::test]
    async fn test_apply_correction_missing_row() {
        let pool = connect_in_memory().await.unwrap();
        let result = apply_correction(&pool, 42, &now(), &TrackCorrection::default()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_plays_since() {
        let pool = connect_in_memory().await.unwrap();
        let t0 = now();
        insert_track(&pool, &new_track("a", "A", t0 - Duration::days(10))).await.unwrap();
        insert_track(&pool, &new_track("b", "B", t0 - Duration::days(2))).await.unwrap();
        insert_track(&pool, &new_track("c", "C", t0 - Duration::days(1))).await.unwrap();

        let plays = plays_since(&pool, &(t0 - Duration::days(7))).await.unwrap();
        let artists: Vec<_> = plays.iter().map(|p| p.artist_name.as_str()).collect();
        assert_eq!(artists, vec!["B", "C"]);
    }
}
