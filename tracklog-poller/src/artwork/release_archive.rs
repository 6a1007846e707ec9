//! Metadata+archive probe (MusicBrainz release search + Cover Art Archive)
//!
//! Searches the top five releases for the artist/album pair in relevance
//! order and returns the first whose front cover exists in the archive.
//! No similarity scoring: an existing cover is the only filter.
//!
//! # API Reference
//! - Search: https://musicbrainz.org/ws/2/release/?query=...&fmt=json
//! - Cover: https://coverartarchive.org/release/{mbid}/front

use super::{url_exists, ArtworkProbe, ArtworkQuery, ProbeError, ProbeOutcome};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, warn};

const SOURCE: &str = "MusicBrainz";

/// Releases examined per search
const RELEASE_LIMIT: usize = 5;

#[derive(Debug, Default, Deserialize)]
struct ReleaseSearchResponse {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
}

pub struct ReleaseArchiveProbe {
    client: Client,
    metadata_url: String,
    archive_url: String,
}

impl ReleaseArchiveProbe {
    pub fn new(
        client: Client,
        metadata_url: impl Into<String>,
        archive_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            metadata_url: metadata_url.into().trim_end_matches('/').to_string(),
            archive_url: archive_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &ArtworkQuery) -> String {
        format!(
            "{}/release/?query=artist:{}%20AND%20release:{}&fmt=json&limit={}",
            self.metadata_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.album),
            RELEASE_LIMIT
        )
    }

    fn cover_url(&self, release_id: &str) -> String {
        format!("{}/release/{}/front", self.archive_url, release_id)
    }

    async fn lookup(&self, query: &ArtworkQuery) -> Result<Option<String>, ProbeError> {
        let response = self.client.get(self.search_url(query)).send().await?;
        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status()));
        }
        let data: ReleaseSearchResponse = response.json().await?;

        debug!(
            artist = %query.artist,
            album = %query.album,
            releases = data.releases.len(),
            "Release search returned"
        );

        for release in data.releases.iter().take(RELEASE_LIMIT) {
            let credited = release
                .artist_credit
                .first()
                .map(|c| c.name.as_str())
                .unwrap_or_default();
            let cover = self.cover_url(&release.id);

            match url_exists(&self.client, &cover).await {
                Ok(()) => {
                    debug!(release_id = %release.id, artist = %credited, title = %release.title, "Cover art found");
                    return Ok(Some(cover));
                }
                Err(e) => {
                    debug!(release_id = %release.id, error = %e, "No cover art for release");
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl ArtworkProbe for ReleaseArchiveProbe {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn applies_to(&self, query: &ArtworkQuery) -> bool {
        query.is_searchable()
    }

    async fn probe(&self, query: &ArtworkQuery) -> ProbeOutcome {
        let started = Instant::now();
        match self.lookup(query).await {
            Ok(Some(url)) => ProbeOutcome::hit(SOURCE, url, started, None),
            Ok(None) => {
                debug!(artist = %query.artist, album = %query.album, "No release had cover art");
                ProbeOutcome::miss(SOURCE, started)
            }
            Err(e) => {
                warn!(artist = %query.artist, album = %query.album, error = %e, "Release search failed");
                ProbeOutcome::miss(SOURCE, started)
            }
        }
    }
}
