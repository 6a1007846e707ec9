//! Direct-URL probe
//!
//! The feed carries last.fm image URLs captured when the track was last
//! seen. They are small and sometimes stale, so the size token is upgraded
//! to 300x300 and the result is HEAD-checked before use.

use super::{url_exists, ArtworkProbe, ArtworkQuery, ProbeOutcome};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Instant;
use tracing::debug;

const SOURCE: &str = "Direct URL";

/// Size token used for upgraded last.fm images
const MEDIUM_SIZE: &str = "300x300";

/// `/u/174s/` or `/u/64x64/` path segment of last.fm image URLs
static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/u/(\d+s|\d+x\d+)/").expect("valid size token pattern"));

/// Rewrite the size token of a last.fm image URL; other URLs pass through
pub fn upgrade_image_quality(url: &str) -> String {
    if !url.contains("lastfm") {
        return url.to_string();
    }
    SIZE_TOKEN
        .replace(url, format!("/u/{}/", MEDIUM_SIZE).as_str())
        .into_owned()
}

pub struct DirectUrlProbe {
    client: Client,
}

impl DirectUrlProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtworkProbe for DirectUrlProbe {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn applies_to(&self, query: &ArtworkQuery) -> bool {
        query.direct_url.is_some()
    }

    async fn probe(&self, query: &ArtworkQuery) -> ProbeOutcome {
        let started = Instant::now();
        let Some(original) = query.direct_url.as_deref() else {
            return ProbeOutcome::miss(SOURCE, started);
        };

        let upgraded = upgrade_image_quality(original);
        debug!(original = %original, upgraded = %upgraded, "Checking feed artwork URL");

        match url_exists(&self.client, &upgraded).await {
            Ok(()) => ProbeOutcome::hit(SOURCE, upgraded, started, None),
            Err(e) => {
                debug!(url = %upgraded, error = %e, "Feed artwork URL rejected");
                ProbeOutcome::miss(SOURCE, started)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::test_support::spawn_server;
    use axum::{http::StatusCode, routing::get, Router};

    #[test]
    fn test_upgrade_square_size_token() {
        assert_eq!(
            upgrade_image_quality("https://lastfm.freetls.fastly.net/i/u/174s/abc.png"),
            "https://lastfm.freetls.fastly.net/i/u/300x300/abc.png"
        );
        assert_eq!(
            upgrade_image_quality("https://lastfm.freetls.fastly.net/i/u/64x64/abc.jpg"),
            "https://lastfm.freetls.fastly.net/i/u/300x300/abc.jpg"
        );
    }

    #[test]
    fn test_upgrade_ignores_other_hosts() {
        let url = "https://img.example.com/i/u/174s/abc.png";
        assert_eq!(upgrade_image_quality(url), url);
    }

    #[test]
    fn test_upgrade_without_size_token() {
        let url = "https://lastfm.example/i/original/abc.png";
        assert_eq!(upgrade_image_quality(url), url);
    }

    #[test]
    fn test_applies_only_with_candidate() {
        let probe = DirectUrlProbe::new(Client::new());
        assert!(!probe.applies_to(&ArtworkQuery::new("Wilco", "Summerteeth")));
        let query = ArtworkQuery::new("Wilco", "Summerteeth")
            .with_direct_url(Some("http://x/a.png".into()));
        assert!(probe.applies_to(&query));
    }

    #[tokio::test]
    async fn test_head_check() {
        let router = Router::new()
            .route("/lastfm/i/u/300x300/good.png", get(|| async { "png" }))
            .route(
                "/lastfm/i/u/300x300/gone.png",
                get(|| async { StatusCode::NOT_FOUND }),
            );
        let base = spawn_server(router).await;
        let probe = DirectUrlProbe::new(Client::new());

        let hit = probe
            .probe(&ArtworkQuery::new("a", "b").with_direct_url(Some(format!(
                "{}/lastfm/i/u/174s/good.png",
                base
            ))))
            .await;
        assert_eq!(hit.url, Some(format!("{}/lastfm/i/u/300x300/good.png", base)));
        assert_eq!(hit.source, SOURCE);

        let miss = probe
            .probe(&ArtworkQuery::new("a", "b").with_direct_url(Some(format!(
                "{}/lastfm/i/u/174s/gone.png",
                base
            ))))
            .await;
        assert!(!miss.is_hit());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_miss() {
        let probe = DirectUrlProbe::new(Client::new());
        let outcome = probe
            .probe(&ArtworkQuery::new("a", "b").with_direct_url(Some(
                "http://127.0.0.1:1/lastfm/i/u/174s/x.png".into(),
            )))
            .await;
        assert!(!outcome.is_hit());
    }
}
