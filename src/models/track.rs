//! Track model

use serde::{Deserialize, Serialize};

/// Track metadata cached from the external catalog.
///
/// Rows are keyed by `spotify_url` and are never deleted, since play history
/// keeps referring to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Database ID
    pub id: i64,
    /// Track title
    pub title: Option<String>,
    /// Performing artist
    pub artist: Option<String>,
    /// Album the track appears on
    pub album: Option<String>,
    /// Length in seconds
    pub length: Option<i64>,
    /// Release date as reported by the catalog
    pub date: Option<String>,
    /// Catalog URL, unique per track
    pub spotify_url: String,
}

/// Metadata supplied when a track is first seen, or backfilled later
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub length: Option<i64>,
    pub date: Option<String>,
}

impl TrackMetadata {
    pub fn new(title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            length: None,
            date: None,
        }
    }

    pub fn with_length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }
}

impl Track {
    /// True if any metadata column is still missing
    pub fn needs_backfill(&self) -> bool {
        self.title.is_none()
            || self.artist.is_none()
            || self.album.is_none()
            || self.length.is_none()
            || self.date.is_none()
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} by {} ({})",
            self.title.as_deref().unwrap_or("?"),
            self.artist.as_deref().unwrap_or("?"),
            self.spotify_url
        )
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.spotify_url == other.spotify_url
    }
}

impl Eq for Track {}
