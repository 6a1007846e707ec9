//! Track-play and fallback-image models

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DJ name recorded when the feed omits one
pub const UNKNOWN_DJ: &str = "Unknown DJ";

/// Stored record of one broadcast event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPlay {
    pub id: i64,
    /// Natural key from the upstream feed
    pub playlist_event_id: Option<String>,
    pub artist_name: String,
    pub track_name: String,
    pub album_name: String,
    pub label_name: String,
    /// Resolved artwork URL, possibly empty
    pub album_art: String,
    /// Placeholder used when no real artwork resolved
    pub fallback_image_id: Option<i64>,
    pub dj_name: String,
    pub show_name: String,
    pub is_local: bool,
    pub played_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Track-play record before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackPlay {
    pub playlist_event_id: Option<String>,
    pub artist_name: String,
    pub track_name: String,
    pub album_name: String,
    pub label_name: String,
    pub album_art: String,
    pub fallback_image_id: Option<i64>,
    pub dj_name: String,
    pub show_name: String,
    pub is_local: bool,
    pub played_at: DateTime<Utc>,
}

/// Descriptive fields rewritten when a recent play is corrected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCorrection {
    pub playlist_event_id: Option<String>,
    pub album_name: Option<String>,
    pub label_name: Option<String>,
    pub album_art: Option<String>,
    pub dj_name: Option<String>,
    pub show_name: Option<String>,
    pub is_local: Option<bool>,
}

/// Logo treatment of a placeholder image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoVariant {
    Primary,
    Alternate,
}

/// Background color of a placeholder image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorVariant {
    Red,
    Blue,
    Yellow,
}

impl LogoVariant {
    pub const ALL: [LogoVariant; 2] = [LogoVariant::Primary, LogoVariant::Alternate];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoVariant::Primary => "primary",
            LogoVariant::Alternate => "alternate",
        }
    }
}

impl ColorVariant {
    pub const ALL: [ColorVariant; 3] = [ColorVariant::Red, ColorVariant::Blue, ColorVariant::Yellow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorVariant::Red => "red",
            ColorVariant::Blue => "blue",
            ColorVariant::Yellow => "yellow",
        }
    }
}

impl fmt::Display for LogoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ColorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogoVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(LogoVariant::Primary),
            "alternate" => Ok(LogoVariant::Alternate),
            other => Err(Error::InvalidInput(format!("Unknown logo variant: {}", other))),
        }
    }
}

impl FromStr for ColorVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(ColorVariant::Red),
            "blue" => Ok(ColorVariant::Blue),
            "yellow" => Ok(ColorVariant::Yellow),
            other => Err(Error::InvalidInput(format!("Unknown color variant: {}", other))),
        }
    }
}

/// Placeholder artwork shown when no album art resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackImage {
    pub id: i64,
    pub url: String,
    pub logo: LogoVariant,
    pub color: ColorVariant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(matches!(
            "green".parse::<ColorVariant>(),
            Err(Error::InvalidInput(_))
        ));
    }
}
