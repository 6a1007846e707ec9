//! tracklog-poller: now-playing feed recorder
//!
//! Polls the station's now-playing feed, resolves album art for each new
//! track and records it in the shared track history.

pub mod artwork;
pub mod fallback;
pub mod feed;
pub mod matcher;
pub mod poller;

pub use artwork::ArtworkResolver;
pub use feed::{HttpPlaylistFeed, PlaylistFeed};
pub use poller::{CycleSummary, Poller, PollerSettings};
