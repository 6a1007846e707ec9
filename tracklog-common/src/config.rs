//! Configuration loading
//!
//! Each setting resolves in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binaries handle tiers 1 and 2 through clap; this module covers the
//! TOML file and the compiled defaults. A missing TOML file is not an
//! error: the binaries start with defaults and, once tracing is up, log
//! the [`ConfigSource`] that loading reports.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "TRACKLOG_CONFIG";

/// Station feed polled by default
pub const DEFAULT_FEED_URL: &str = "https://chirpradio.appspot.com/api/current_playlist";

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub poller: PollerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Playlist poller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Now-playing feed endpoint
    pub feed_url: String,
    /// Seconds between poll cycles
    pub interval_secs: u64,
    /// Artwork resolution timeout for the first attempt
    pub first_pass_timeout_ms: u64,
    /// Artwork resolution timeout for the retry against a fresh feed
    pub retry_timeout_ms: u64,
    /// Show name recorded with every track (the feed carries none)
    pub show_name: String,
    /// User-Agent sent to the metadata service (required by MusicBrainz)
    pub user_agent: String,
    /// iTunes Search API endpoint
    pub catalog_url: String,
    /// MusicBrainz WS/2 base URL
    pub metadata_url: String,
    /// Cover Art Archive base URL
    pub archive_url: String,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            interval_secs: 30,
            first_pass_timeout_ms: 3000,
            retry_timeout_ms: 2000,
            show_name: "Live on CHIRP Radio".to_string(),
            user_agent: "CHIRPRadio/3.0 (https://chirpradio.org)".to_string(),
            catalog_url: "https://itunes.apple.com/search".to_string(),
            metadata_url: "https://musicbrainz.org/ws/2".to_string(),
            archive_url: "https://coverartarchive.org".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// HTTP service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5780".to_string(),
        }
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at this path; compiled defaults in use
    Missing(PathBuf),
    /// No config directory on this platform; compiled defaults in use
    Defaults,
}

impl ConfigSource {
    /// Report the source; call after the tracing subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {}, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => {
                warn!("No config directory available, using compiled defaults")
            }
        }
    }
}

impl TomlConfig {
    /// Load configuration from the resolved config file path
    ///
    /// Falls back to defaults when no file exists.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_path) {
            Some(path) => load_toml_config(&path),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Database path from the file, or the platform default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Resolve the config file location: CLI, then environment, then platform default
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("tracklog").join("config.toml"))
}

/// Read and parse a TOML config file
///
/// A missing file yields defaults; an unparsable file is an error.
pub fn load_toml_config(path: &Path) -> Result<(TomlConfig, ConfigSource)> {
    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tracklog"))
        .unwrap_or_else(|| PathBuf::from("./tracklog_data"))
        .join("tracklog.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_defaults() {
        let poller = PollerConfig::default();
        assert_eq!(poller.interval_secs, 30);
        assert_eq!(poller.first_pass_timeout_ms, 3000);
        assert_eq!(poller.retry_timeout_ms, 2000);
        assert_eq!(poller.feed_url, DEFAULT_FEED_URL);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [poller]
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.interval_secs, 60);
        assert_eq!(config.poller.retry_timeout_ms, 2000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn test_cli_path_wins() {
        let path = Path::new("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_default_database_path_file_name() {
        assert!(default_database_path().ends_with("tracklog.db"));
    }
}
