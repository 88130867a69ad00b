//! Play history models

use serde::{Deserialize, Serialize};

/// A track that was played. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayHistoryEntry {
    /// Database ID
    pub id: i64,
    pub track_id: i64,
    /// The user who queued the track, if any
    pub user_id: Option<i64>,
    /// Unix timestamp when the track started playing
    pub time_played: i64,
}

/// Play count for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPlayCount {
    pub track_id: i64,
    pub plays: i64,
    pub last_played: i64,
}

/// Play count for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlayCount {
    pub user_id: i64,
    pub plays: i64,
}
