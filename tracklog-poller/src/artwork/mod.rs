//! Album-art resolution
//!
//! Three independent probes each try to turn an (artist, album[, candidate
//! URL]) query into an artwork URL:
//! - `DirectUrlProbe`: validates the image URL the feed already carries
//! - `CatalogSearchProbe`: iTunes Search with PG filtering and fuzzy ranking
//! - `ReleaseArchiveProbe`: MusicBrainz release search + Cover Art Archive
//!
//! `ArtworkResolver` races them against a timeout.
//!
//! Probes never fail: every network, status or parse problem becomes a
//! miss for that probe alone.

pub mod catalog;
pub mod direct;
pub mod release_archive;
pub mod resolver;

pub use catalog::CatalogSearchProbe;
pub use direct::DirectUrlProbe;
pub use release_archive::ReleaseArchiveProbe;
pub use resolver::ArtworkResolver;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracklog_common::config::PollerConfig;

/// Names and optional candidate URL for one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkQuery {
    pub artist: String,
    pub album: String,
    /// Image URL supplied by the feed, if any
    pub direct_url: Option<String>,
}

impl ArtworkQuery {
    pub fn new(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            direct_url: None,
        }
    }

    pub fn with_direct_url(mut self, url: Option<String>) -> Self {
        self.direct_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Name searches need an artist; the album may be blank
    pub fn is_searchable(&self) -> bool {
        !self.artist.trim().is_empty()
    }
}

/// Result of a single probe attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub url: Option<String>,
    pub source: &'static str,
    pub elapsed: Duration,
    /// Match score, for probes that rank candidates
    pub score: Option<f64>,
}

impl ProbeOutcome {
    pub fn hit(source: &'static str, url: String, started: Instant, score: Option<f64>) -> Self {
        Self {
            url: Some(url),
            source,
            elapsed: started.elapsed(),
            score,
        }
    }

    pub fn miss(source: &'static str, started: Instant) -> Self {
        Self {
            url: None,
            source,
            elapsed: started.elapsed(),
            score: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.url.is_some()
    }
}

/// Reasons a probe came back empty-handed
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// One artwork lookup strategy
#[async_trait]
pub trait ArtworkProbe: Send + Sync {
    /// Label used in logs and outcomes
    fn name(&self) -> &'static str;

    /// Whether the probe has anything to work with for this query
    fn applies_to(&self, query: &ArtworkQuery) -> bool;

    /// Attempt resolution; misses are reported in the outcome, never as errors
    async fn probe(&self, query: &ArtworkQuery) -> ProbeOutcome;
}

/// HTTP client shared by the probes
///
/// The User-Agent is required by MusicBrainz and harmless elsewhere.
pub fn build_http_client(config: &PollerConfig) -> Result<Client, ProbeError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// HEAD a URL and report whether it answered 2xx
pub(crate) async fn url_exists(client: &Client, url: &str) -> Result<(), ProbeError> {
    let response = client.head(url).send().await?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ProbeError::Status(response.status()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_direct_url_is_dropped() {
        let query = ArtworkQuery::new("Wilco", "Summerteeth").with_direct_url(Some("  ".into()));
        assert_eq!(query.direct_url, None);
    }

    #[test]
    fn test_searchable_requires_artist_only() {
        assert!(ArtworkQuery::new("Wilco", "Summerteeth").is_searchable());
        assert!(ArtworkQuery::new("Wilco", "").is_searchable());
        assert!(!ArtworkQuery::new(" ", "Summerteeth").is_searchable());
    }
}
