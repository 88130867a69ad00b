//! Queue table operations

use sqlx::{FromRow, SqliteConnection};
use super::{first_row, single_row};

use crate::error::{Error, Result};
use crate::models::QueueEntry;

/// Database row for queue_entry table
#[derive(Debug, FromRow)]
struct QueueEntryRow {
    id: i64,
    track_id: i64,
    user_id: Option<i64>,
    backend_slot_id: Option<i64>,
    time_added: i64,
    user_priority: i64,
    playback_priority: i64,
}

impl QueueEntryRow {
    fn into_entry(self) -> QueueEntry {
        QueueEntry {
            id: self.id,
            track_id: self.track_id,
            user_id: self.user_id,
            backend_slot_id: self.backend_slot_id,
            time_added: self.time_added,
            user_priority: self.user_priority,
            playback_priority: self.playback_priority,
        }
    }
}

/// Queue entry joined with its track's catalog URL
#[derive(Debug, Clone, FromRow)]
pub struct QueueSlotRow {
    pub id: i64,
    pub backend_slot_id: Option<i64>,
    pub spotify_url: String,
}

/// Queue table operations
pub struct QueueTable;

impl QueueTable {
    /// Next (user_priority, playback_priority) pair, computed as max + 1 over
    /// the live queue. Both restart at 1 once the queue is empty.
    pub async fn next_priorities(conn: &mut SqliteConnection) -> Result<(i64, i64)> {
        let (user_max, playback_max): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(MAX(user_priority), 0), COALESCE(MAX(playback_priority), 0) FROM queue_entry",
        )
        .fetch_all(&mut *conn)
        .await
        .and_then(single_row)?;

        let user = user_max
            .checked_add(1)
            .ok_or(Error::PriorityOverflow(user_max))?;
        let playback = playback_max
            .checked_add(1)
            .ok_or(Error::PriorityOverflow(playback_max))?;
        Ok((user, playback))
    }

    /// Insert an entry with caller-supplied priorities
    pub async fn insert(
        conn: &mut SqliteConnection,
        track_id: i64,
        user_id: Option<i64>,
        backend_slot_id: Option<i64>,
        time_added: i64,
        priorities: (i64, i64),
    ) -> Result<QueueEntry> {
        let row: QueueEntryRow = sqlx::query_as(
            r#"
            INSERT INTO queue_entry
                (track_id, user_id, backend_slot_id, time_added, user_priority, playback_priority)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(track_id)
        .bind(user_id)
        .bind(backend_slot_id)
        .bind(time_added)
        .bind(priorities.0)
        .bind(priorities.1)
        .fetch_all(&mut *conn)
        .await
        .and_then(single_row)
        .map_err(|e| Error::from_write(e, "queue entry for track", track_id.to_string()))?;

        Ok(row.into_entry())
    }

    /// Insert an entry whose priorities are computed by the inserting
    /// statement itself, so no other writer can slip in between.
    ///
    /// Inserts nothing and fails with `PriorityOverflow` when either maximum
    /// is already `i64::MAX`.
    pub async fn insert_next(
        conn: &mut SqliteConnection,
        track_id: i64,
        user_id: Option<i64>,
        backend_slot_id: Option<i64>,
        time_added: i64,
    ) -> Result<QueueEntry> {
        let row: Option<QueueEntryRow> = sqlx::query_as(
            r#"
            INSERT INTO queue_entry
                (track_id, user_id, backend_slot_id, time_added, user_priority, playback_priority)
            SELECT ?, ?, ?, ?, user_max + 1, playback_max + 1
            FROM (
                SELECT
                    COALESCE(MAX(user_priority), 0) AS user_max,
                    COALESCE(MAX(playback_priority), 0) AS playback_max
                FROM queue_entry
            )
            WHERE user_max < ? AND playback_max < ?
            RETURNING *
            "#,
        )
        .bind(track_id)
        .bind(user_id)
        .bind(backend_slot_id)
        .bind(time_added)
        .bind(i64::MAX)
        .bind(i64::MAX)
        .fetch_all(&mut *conn)
        .await
        .map(first_row)
        .map_err(|e| Error::from_write(e, "queue entry for track", track_id.to_string()))?;

        row.map(|r| r.into_entry())
            .ok_or(Error::PriorityOverflow(i64::MAX))
    }

    /// Get entry by ID
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<QueueEntry>> {
        let row: Option<QueueEntryRow> = sqlx::query_as("SELECT * FROM queue_entry WHERE id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_entry()))
    }

    /// All live entries in playback order
    pub async fn list_ordered(conn: &mut SqliteConnection) -> Result<Vec<QueueEntry>> {
        let rows: Vec<QueueEntryRow> =
            sqlx::query_as("SELECT * FROM queue_entry ORDER BY playback_priority ASC, id ASC")
                .fetch_all(&mut *conn)
                .await?;

        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }

    /// Entries in playback order with their catalog URLs
    pub async fn list_slots(conn: &mut SqliteConnection) -> Result<Vec<QueueSlotRow>> {
        let rows: Vec<QueueSlotRow> = sqlx::query_as(
            r#"
            SELECT q.id, q.backend_slot_id, t.spotify_url
            FROM queue_entry q JOIN track t ON t.id = q.track_id
            ORDER BY q.playback_priority ASC, q.id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// First entry in playback order carrying the given backend slot id
    pub async fn find_by_slot(
        conn: &mut SqliteConnection,
        backend_slot_id: i64,
    ) -> Result<Option<QueueEntry>> {
        let row: Option<QueueEntryRow> = sqlx::query_as(
            "SELECT * FROM queue_entry WHERE backend_slot_id = ? ORDER BY playback_priority ASC, id ASC LIMIT 1",
        )
        .bind(backend_slot_id)
        .fetch_all(&mut *conn)
        .await
        .map(first_row)?;

        Ok(row.map(|r| r.into_entry()))
    }

    /// Set or clear the backend slot id
    pub async fn set_slot(
        conn: &mut SqliteConnection,
        id: i64,
        backend_slot_id: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE queue_entry SET backend_slot_id = ? WHERE id = ?")
            .bind(backend_slot_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite one entry's playback priority. Other entries are untouched.
    pub async fn set_playback_priority(
        conn: &mut SqliteConnection,
        id: i64,
        playback_priority: i64,
    ) -> Result<Option<QueueEntry>> {
        let row: Option<QueueEntryRow> =
            sqlx::query_as("UPDATE queue_entry SET playback_priority = ? WHERE id = ? RETURNING *")
                .bind(playback_priority)
                .bind(id)
                .fetch_all(&mut *conn)
                .await
                .map(first_row)?;

        Ok(row.map(|r| r.into_entry()))
    }

    /// Delete an entry and hand back what it looked like
    pub async fn delete_returning(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<QueueEntry>> {
        let row: Option<QueueEntryRow> =
            sqlx::query_as("DELETE FROM queue_entry WHERE id = ? RETURNING *")
                .bind(id)
                .fetch_all(&mut *conn)
                .await
                .map(first_row)?;

        Ok(row.map(|r| r.into_entry()))
    }

    /// Get entry count
    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM queue_entry")
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)?;

        Ok(row.0)
    }
}
