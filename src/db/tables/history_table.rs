//! Play history table operations

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use super::{first_row, single_row};

use crate::error::{Error, Result};
use crate::models::{PlayHistoryEntry, TrackPlayCount, UserPlayCount};

/// Database row for play_history table
#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    track_id: i64,
    user_id: Option<i64>,
    time_played: i64,
}

impl HistoryRow {
    fn into_entry(self) -> PlayHistoryEntry {
        PlayHistoryEntry {
            id: self.id,
            track_id: self.track_id,
            user_id: self.user_id,
            time_played: self.time_played,
        }
    }
}

/// Which slice of the history to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFilter {
    All,
    Track(i64),
    User(i64),
}

/// Play history table operations
pub struct HistoryTable;

impl HistoryTable {
    /// Append a history row
    pub async fn insert(
        conn: &mut SqliteConnection,
        track_id: i64,
        user_id: Option<i64>,
        time_played: i64,
    ) -> Result<PlayHistoryEntry> {
        let row: HistoryRow = sqlx::query_as(
            "INSERT INTO play_history (track_id, user_id, time_played) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(track_id)
        .bind(user_id)
        .bind(time_played)
        .fetch_all(&mut *conn)
        .await
        .and_then(single_row)
        .map_err(|e| Error::from_write(e, "history entry for track", track_id.to_string()))?;

        Ok(row.into_entry())
    }

    /// Get history entry by ID
    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<PlayHistoryEntry>> {
        let row: Option<HistoryRow> = sqlx::query_as("SELECT * FROM play_history WHERE id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_entry()))
    }

    /// Stream history rows, newest first. Rows are pulled from the database
    /// as the stream is polled.
    pub fn stream(pool: &SqlitePool, filter: HistoryFilter) -> BoxStream<'_, Result<PlayHistoryEntry>> {
        let query = match filter {
            HistoryFilter::All => sqlx::query_as::<_, HistoryRow>(
                "SELECT * FROM play_history ORDER BY time_played DESC, id DESC",
            ),
            HistoryFilter::Track(track_id) => sqlx::query_as::<_, HistoryRow>(
                "SELECT * FROM play_history WHERE track_id = ? ORDER BY time_played DESC, id DESC",
            )
            .bind(track_id),
            HistoryFilter::User(user_id) => sqlx::query_as::<_, HistoryRow>(
                "SELECT * FROM play_history WHERE user_id = ? ORDER BY time_played DESC, id DESC",
            )
            .bind(user_id),
        };

        query
            .fetch(pool)
            .map_ok(HistoryRow::into_entry)
            .map_err(Error::from)
            .boxed()
    }

    /// Number of plays of one track
    pub async fn count_for_track(conn: &mut SqliteConnection, track_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM play_history WHERE track_id = ?")
            .bind(track_id)
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)?;

        Ok(row.0)
    }

    /// Tracks with the most plays
    pub async fn most_played_tracks(
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> Result<Vec<TrackPlayCount>> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT track_id, COUNT(*) AS plays, MAX(time_played) AS last_played
            FROM play_history
            GROUP BY track_id
            ORDER BY plays DESC, last_played DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(track_id, plays, last_played)| TrackPlayCount {
                track_id,
                plays,
                last_played,
            })
            .collect())
    }

    /// Users whose queued tracks were played most often. Anonymous plays are
    /// not counted.
    pub async fn most_active_users(
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> Result<Vec<UserPlayCount>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT user_id, COUNT(*) AS plays
            FROM play_history
            WHERE user_id IS NOT NULL
            GROUP BY user_id
            ORDER BY plays DESC, user_id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, plays)| UserPlayCount { user_id, plays })
            .collect())
    }
}
