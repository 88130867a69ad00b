//! Play queue models

use serde::{Deserialize, Serialize};

/// A track waiting to be played.
///
/// Rows live until the track is played, at which point they are turned into
/// a [`PlayHistoryEntry`](super::PlayHistoryEntry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Database ID, also the tie breaker for equal playback priorities
    pub id: i64,
    pub track_id: i64,
    /// None for anonymous enqueues
    pub user_id: Option<i64>,
    /// Slot id assigned by the playback backend. Best effort only, it may be
    /// missing, stale, or shared by two entries.
    pub backend_slot_id: Option<i64>,
    /// Unix timestamp
    pub time_added: i64,
    /// Position in the shared per-insertion counter
    pub user_priority: i64,
    /// Position in the global playback order
    pub playback_priority: i64,
}

impl QueueEntry {
    /// Ordering key used by every queue listing
    pub fn order_key(&self) -> (i64, i64) {
        (self.playback_priority, self.id)
    }
}

/// One slot in the playback backend's own playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSlot {
    pub slot_id: i64,
    /// Catalog URL of the track sitting in that slot
    pub spotify_url: String,
}

impl BackendSlot {
    pub fn new(slot_id: i64, spotify_url: &str) -> Self {
        Self {
            slot_id,
            spotify_url: spotify_url.to_string(),
        }
    }
}

/// How concurrent enqueues pick their priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityStrategy {
    /// Read the current maximum, then insert. Concurrent callers may end up
    /// with the same priority.
    Naive,
    /// All queue writes go through one writer and compute the maximum inside
    /// the inserting statement.
    #[default]
    Serialized,
}

impl PriorityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityStrategy::Naive => "naive",
            PriorityStrategy::Serialized => "serialized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_breaks_ties_by_id() {
        let a = QueueEntry {
            id: 7,
            track_id: 1,
            user_id: None,
            backend_slot_id: None,
            time_added: 0,
            user_priority: 1,
            playback_priority: 3,
        };
        let b = QueueEntry { id: 4, ..a.clone() };
        let mut entries = vec![a, b];
        entries.sort_by_key(|e| e.order_key());
        assert_eq!(entries[0].id, 4);
    }

    #[test]
    fn test_strategy_serde() {
        let s: PriorityStrategy = serde_json::from_str("\"naive\"").unwrap();
        assert_eq!(s, PriorityStrategy::Naive);
        assert_eq!(PriorityStrategy::default().as_str(), "serialized");
    }
}
