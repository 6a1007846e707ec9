//! Race-with-timeout artwork resolver
//!
//! Every applicable probe runs as its own task and reports on a shared
//! channel. The first outcome carrying a URL wins. If every probe reports
//! a miss, or the deadline passes first, resolution yields `None`.
//!
//! Losing probes are abandoned rather than cancelled: their tasks run to
//! completion in the background and their sends fail once the receiver is
//! gone. Probes must therefore be free of side effects.

use super::{
    build_http_client, ArtworkProbe, ArtworkQuery, CatalogSearchProbe, DirectUrlProbe,
    ProbeError, ProbeOutcome, ReleaseArchiveProbe,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracklog_common::config::PollerConfig;

/// Races a set of probes for the first artwork URL
#[derive(Clone)]
pub struct ArtworkResolver {
    probes: Vec<Arc<dyn ArtworkProbe>>,
}

impl ArtworkResolver {
    pub fn new(probes: Vec<Arc<dyn ArtworkProbe>>) -> Self {
        Self { probes }
    }

    /// Direct-URL, catalog-search and metadata+archive probes over one HTTP client
    pub fn from_config(config: &PollerConfig) -> Result<Self, ProbeError> {
        let client = build_http_client(config)?;
        let probes: Vec<Arc<dyn ArtworkProbe>> = vec![
            Arc::new(DirectUrlProbe::new(client.clone())),
            Arc::new(CatalogSearchProbe::new(client.clone(), config.catalog_url.clone())),
            Arc::new(ReleaseArchiveProbe::new(
                client,
                config.metadata_url.clone(),
                config.archive_url.clone(),
            )),
        ];
        Ok(Self::new(probes))
    }

    /// Resolve artwork for `query` within `timeout`
    pub async fn resolve(&self, query: &ArtworkQuery, timeout: Duration) -> Option<String> {
        let started = Instant::now();
        let applicable: Vec<Arc<dyn ArtworkProbe>> = self
            .probes
            .iter()
            .filter(|probe| probe.applies_to(query))
            .cloned()
            .collect();

        if applicable.is_empty() {
            debug!(artist = %query.artist, album = %query.album, "No applicable artwork probes");
            return None;
        }

        debug!(
            artist = %query.artist,
            album = %query.album,
            probes = applicable.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Resolving album art"
        );

        // Capacity covers every probe, so no send ever waits on the receiver
        let (tx, mut rx) = mpsc::channel::<ProbeOutcome>(applicable.len());
        for probe in applicable {
            let tx = tx.clone();
            let query = query.clone();
            tokio::spawn(async move {
                let outcome = probe.probe(&query).await;
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let first_hit = async {
            while let Some(outcome) = rx.recv().await {
                debug!(
                    source = outcome.source,
                    hit = outcome.is_hit(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    score = ?outcome.score,
                    "Probe finished"
                );
                if outcome.is_hit() {
                    return Some(outcome);
                }
            }
            None
        };

        match tokio::time::timeout(timeout, first_hit).await {
            Ok(Some(outcome)) => {
                info!(
                    artist = %query.artist,
                    album = %query.album,
                    source = outcome.source,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Album art resolved"
                );
                outcome.url
            }
            Ok(None) => {
                info!(
                    artist = %query.artist,
                    album = %query.album,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Album art resolution failed: no probe found artwork"
                );
                None
            }
            Err(_) => {
                info!(
                    artist = %query.artist,
                    album = %query.album,
                    timeout_ms = timeout.as_millis() as u64,
                    "Album art resolution failed: timeout"
                );
                None
            }
        }
    }
}
