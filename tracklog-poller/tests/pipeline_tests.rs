//! End-to-end poller tests against a local stand-in for the feed and the
//! artwork services

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracklog_common::config::PollerConfig;
use tracklog_common::db::{connect_in_memory, fallback_images, tracks, SqliteTrackStore, TrackStore};
use tracklog_common::models::TrackPlay;
use tracklog_poller::fallback::select_fallback;
use tracklog_poller::{ArtworkResolver, HttpPlaylistFeed, Poller, PollerSettings};

struct Upstream {
    base: String,
    feed_fetches: Arc<AtomicUsize>,
}

/// Serve the feed plus catalog, metadata and archive endpoints
///
/// `catalog` is the search response body, or `None` for a 500.
async fn upstream(feed_track: impl Fn(&str) -> Value, catalog: Option<Value>) -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let feed_body = json!({ "now_playing": feed_track(&base), "recently_played": [] });
    let feed_fetches = Arc::new(AtomicUsize::new(0));

    let fetches = feed_fetches.clone();
    let router = Router::new()
        .route(
            "/api/current_playlist",
            get(move || {
                fetches.fetch_add(1, Ordering::SeqCst);
                let body = feed_body.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/search",
            get(move || {
                let catalog = catalog.clone();
                async move {
                    match catalog {
                        Some(body) => Ok(Json(body)),
                        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
                    }
                }
            }),
        )
        .route("/ws/2/release/", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route(
            "/lastfm/i/u/300x300/missing.png",
            get(|| async { StatusCode::NOT_FOUND }),
        );

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Upstream { base, feed_fetches }
}

fn config(base: &str) -> PollerConfig {
    PollerConfig {
        feed_url: format!("{}/api/current_playlist", base),
        first_pass_timeout_ms: 1000,
        retry_timeout_ms: 1000,
        catalog_url: format!("{}/search", base),
        metadata_url: format!("{}/ws/2", base),
        archive_url: format!("{}/caa", base),
        request_timeout_secs: 5,
        ..PollerConfig::default()
    }
}

async fn poller(config: &PollerConfig, store: &SqliteTrackStore) -> Poller {
    let feed = HttpPlaylistFeed::new(config.feed_url.clone(), Duration::from_secs(5)).unwrap();
    Poller::new(
        Arc::new(feed),
        Arc::new(store.clone()),
        ArtworkResolver::from_config(config).unwrap(),
        PollerSettings::from(config),
    )
    .await
    .unwrap()
}

async fn seeded_store() -> SqliteTrackStore {
    let pool = connect_in_memory().await.unwrap();
    fallback_images::seed_fallback_catalog(&pool, "https://cdn.example/fallback")
        .await
        .unwrap();
    SqliteTrackStore::new(pool)
}

async fn recorded(store: &SqliteTrackStore) -> Vec<TrackPlay> {
    let epoch = chrono::DateTime::from_timestamp(0, 0).unwrap();
    tracks::plays_since(store.pool(), &epoch).await.unwrap()
}

fn wilco(_base: &str) -> Value {
    json!({
        "id": "e1",
        "artist": "Wilco",
        "track": "Jesus, Etc.",
        "release": "Yankee Hotel Foxtrot",
        "label": "Nonesuch",
        "dj": "Shannon",
        "played_at_gmt": "2024-05-01T18:00:00"
    })
}

#[tokio::test]
async fn test_catalog_hit_is_recorded_with_large_artwork() {
    let catalog = json!({
        "resultCount": 1,
        "results": [{
            "artistName": "Wilco",
            "collectionName": "Yankee Hotel Foxtrot",
            "artworkUrl100": "https://is1.example/yhf/100x100bb.jpg",
            "collectionExplicitness": "notExplicit"
        }]
    });
    let upstream = upstream(wilco, Some(catalog)).await;
    let store = seeded_store().await;
    let poller = poller(&config(&upstream.base), &store).await;

    let summary = poller.run_cycle().await.unwrap();
    assert_eq!(summary.recorded, 1);

    let rows = recorded(&store).await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.playlist_event_id.as_deref(), Some("e1"));
    assert_eq!(row.album_art, "https://is1.example/yhf/600x600bb.jpg");
    assert_eq!(row.fallback_image_id, None);
    assert_eq!(row.dj_name, "Shannon");
    assert_eq!(row.label_name, "Nonesuch");
    assert_eq!(row.show_name, "Live on CHIRP Radio");
    assert_eq!(row.played_at.to_rfc3339(), "2024-05-01T18:00:00+00:00");
    assert_eq!(upstream.feed_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_total_failure_records_fallback_after_refetch() {
    let with_dead_candidate = |base: &str| {
        let mut track = wilco(base);
        track["lastfm_urls"] = json!({ "large_image": format!("{}/lastfm/i/u/174s/missing.png", base) });
        track
    };
    let upstream = upstream(with_dead_candidate, None).await;
    let store = seeded_store().await;
    let catalog = store.load_fallback_catalog().await.unwrap();
    let poller = poller(&config(&upstream.base), &store).await;

    assert_eq!(poller.run_cycle().await.unwrap().recorded, 1);
    assert_eq!(upstream.feed_fetches.load(Ordering::SeqCst), 2);

    let expected = select_fallback("Wilco", "Yankee Hotel Foxtrot", &catalog, None).unwrap();
    let row = &recorded(&store).await[0];
    assert_eq!(row.album_art, expected.url);
    assert_eq!(row.fallback_image_id, Some(expected.id));
}

#[tokio::test]
async fn test_repeated_cycles_record_each_event_once() {
    let catalog = json!({ "resultCount": 0, "results": [] });
    let upstream = upstream(wilco, Some(catalog)).await;
    let store = seeded_store().await;
    let poller = poller(&config(&upstream.base), &store).await;

    assert_eq!(poller.run_cycle().await.unwrap().recorded, 1);
    let second = poller.run_cycle().await.unwrap();
    assert_eq!(second.recorded, 0);
    assert_eq!(second.already_recorded, 1);
    assert_eq!(recorded(&store).await.len(), 1);
}
