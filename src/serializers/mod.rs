//! Serializers for converting database models to external records
//!
//! These are the flat shapes handed to whatever sits in front of the stores
//! (an HTTP layer, the CLI). Field names are part of that contract.

use serde::{Deserialize, Serialize};

use crate::models::{display_fields, PlayHistoryEntry, QueueEntry, Track, User};
use crate::utils::dates::format_ctime;

/// A queue entry flattened together with its track and queuing user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub spotify_url: String,
    pub date: Option<String>,
    pub length: Option<i64>,
    pub id: i64,
    #[serde(rename = "mpd_id")]
    pub backend_slot_id: Option<i64>,
    pub playback_priority: i64,
    pub user_priority: i64,
    /// ctime-style local time
    pub time_added: String,
    /// Display name, "Anonymous" when nobody queued it
    pub user: String,
    /// Username, "anonymous" when nobody queued it
    pub username: String,
    pub user_id: Option<i64>,
}

impl QueueEntryView {
    pub fn new(entry: &QueueEntry, track: &Track, user: Option<&User>) -> Self {
        let (name, username) = display_fields(user);

        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            spotify_url: track.spotify_url.clone(),
            date: track.date.clone(),
            length: track.length,
            id: entry.id,
            backend_slot_id: entry.backend_slot_id,
            playback_priority: entry.playback_priority,
            user_priority: entry.user_priority,
            time_added: format_ctime(entry.time_added),
            user: name,
            username,
            user_id: entry.user_id,
        }
    }
}

/// A played track, for history and statistics listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryView {
    pub id: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub spotify_url: String,
    pub time_played: String,
    pub user: String,
    pub username: String,
    pub tally: i64,
}

impl HistoryEntryView {
    pub fn new(entry: &PlayHistoryEntry, track: &Track, user: Option<&User>, tally: i64) -> Self {
        let (name, username) = display_fields(user);

        Self {
            id: entry.id,
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            spotify_url: track.spotify_url.clone(),
            time_played: format_ctime(entry.time_played),
            user: name,
            username,
            tally,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: 3,
            title: Some("Dancing Queen".into()),
            artist: Some("ABBA".into()),
            album: Some("Arrival".into()),
            length: Some(231),
            date: Some("1976".into()),
            spotify_url: "spotify:track:0GjEhVFGZW8afUYGChu3Rr".into(),
        }
    }

    fn entry(user_id: Option<i64>) -> QueueEntry {
        QueueEntry {
            id: 8,
            track_id: 3,
            user_id,
            backend_slot_id: Some(44),
            time_added: 1_700_000_000,
            user_priority: 2,
            playback_priority: 5,
        }
    }

    #[test]
    fn test_queue_view_field_set() {
        let view = QueueEntryView::new(&entry(None), &track(), None);
        let json = serde_json::to_value(&view).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "album",
                "artist",
                "date",
                "id",
                "length",
                "mpd_id",
                "playback_priority",
                "spotify_url",
                "time_added",
                "title",
                "user",
                "user_id",
                "user_priority",
                "username",
            ]
        );
        assert_eq!(obj["user"], "Anonymous");
        assert_eq!(obj["username"], "anonymous");
        assert_eq!(obj["mpd_id"], 44);
        assert_eq!(obj["time_added"], format_ctime(1_700_000_000));
    }

    #[test]
    fn test_queue_view_with_user() {
        let user = User {
            id: 1,
            name: "Alice".into(),
            username: "alice".into(),
            password: "hash".into(),
            privs: 0,
        };
        let view = QueueEntryView::new(&entry(Some(1)), &track(), Some(&user));
        assert_eq!(view.user, "Alice");
        assert_eq!(view.username, "alice");
        assert_eq!(view.user_id, Some(1));
    }

    #[test]
    fn test_history_view() {
        let played = PlayHistoryEntry {
            id: 2,
            track_id: 3,
            user_id: None,
            time_played: 0,
        };
        let view = HistoryEntryView::new(&played, &track(), None, -1);
        assert_eq!(view.username, "anonymous");
        assert_eq!(view.tally, -1);
    }
}
