//! Catalog-search probe (iTunes Search API)
//!
//! Searches albums for "artist album", drops explicit releases, ranks the
//! rest by fuzzy name similarity and returns the 600x600 artwork variant
//! of the best candidate scoring at least 0.70.

use super::{ArtworkProbe, ArtworkQuery, ProbeError, ProbeOutcome};
use crate::matcher::similarity;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, warn};

const SOURCE: &str = "iTunes";

/// Minimum averaged artist/album similarity
pub const MIN_MATCH_SCORE: f64 = 0.70;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    result_count: u32,
    #[serde(default)]
    results: Vec<CatalogResult>,
}

/// One album from the search response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResult {
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub collection_name: String,
    pub artwork_url100: Option<String>,
    pub collection_explicitness: Option<String>,
    pub track_explicitness: Option<String>,
}

impl CatalogResult {
    fn is_explicit(&self) -> bool {
        self.collection_explicitness.as_deref() == Some("explicit")
            || self.track_explicitness.as_deref() == Some("explicit")
    }
}

/// Best clean candidate at or above the threshold
///
/// Scans in response order and only replaces the leader on a strictly
/// higher score, so the first of equally scored candidates wins.
pub fn best_match<'a>(
    artist: &str,
    album: &str,
    results: &'a [CatalogResult],
) -> Option<(&'a CatalogResult, f64)> {
    let mut best: Option<(&CatalogResult, f64)> = None;

    for result in results.iter().filter(|r| !r.is_explicit()) {
        let score =
            (similarity(artist, &result.artist_name) + similarity(album, &result.collection_name))
                / 2.0;

        debug!(
            artist = %result.artist_name,
            album = %result.collection_name,
            score,
            "Catalog candidate"
        );

        let leads = best.map_or(true, |(_, best_score)| score > best_score);
        if leads && score >= MIN_MATCH_SCORE && result.artwork_url100.is_some() {
            best = Some((result, score));
        }
    }

    best
}

pub struct CatalogSearchProbe {
    client: Client,
    search_url: String,
}

impl CatalogSearchProbe {
    pub fn new(client: Client, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    async fn lookup(&self, query: &ArtworkQuery) -> Result<Option<(String, f64)>, ProbeError> {
        let term = format!("{} {}", query.artist.trim(), query.album.trim());
        let term = urlencoding::encode(term.trim()).into_owned();
        let url = format!(
            "{}?term={}&media=music&entity=album&limit=25&explicit=No&country=US",
            self.search_url, term
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status()));
        }
        let data: SearchResponse = response.json().await?;

        debug!(
            artist = %query.artist,
            album = %query.album,
            result_count = data.result_count,
            "Catalog search returned"
        );

        Ok(best_match(&query.artist, &query.album, &data.results).and_then(|(result, score)| {
            result
                .artwork_url100
                .as_ref()
                .map(|art| (art.replace("100x100", "600x600"), score))
        }))
    }
}

#[async_trait]
impl ArtworkProbe for CatalogSearchProbe {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn applies_to(&self, query: &ArtworkQuery) -> bool {
        query.is_searchable()
    }

    async fn probe(&self, query: &ArtworkQuery) -> ProbeOutcome {
        let started = Instant::now();
        match self.lookup(query).await {
            Ok(Some((url, score))) => ProbeOutcome::hit(SOURCE, url, started, Some(score)),
            Ok(None) => {
                debug!(artist = %query.artist, album = %query.album, "No catalog match met threshold");
                ProbeOutcome::miss(SOURCE, started)
            }
            Err(e) => {
                warn!(artist = %query.artist, album = %query.album, error = %e, "Catalog search failed");
                ProbeOutcome::miss(SOURCE, started)
            }
        }
    }
}
