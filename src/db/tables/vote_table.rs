//! Vote table operations

use sqlx::{FromRow, SqliteConnection};
use super::{first_row, single_row};

use crate::error::{Error, Result};
use crate::models::{Vote, VoteDirection, VoteTarget};

/// Database row for vote table
#[derive(Debug, FromRow)]
struct VoteRow {
    id: i64,
    user_id: i64,
    queue_entry_id: Option<i64>,
    history_entry_id: Option<i64>,
    direction: i64,
}

impl VoteRow {
    fn into_vote(self) -> Option<Vote> {
        // the CHECK constraint keeps both of these valid
        let target = VoteTarget::from_columns(self.queue_entry_id, self.history_entry_id)?;
        let direction = VoteDirection::try_from(self.direction).ok()?;

        Some(Vote {
            id: self.id,
            user_id: self.user_id,
            target,
            direction,
        })
    }
}

/// Vote table operations
pub struct VoteTable;

impl VoteTable {
    /// Insert a vote, or update the direction of the existing vote by the
    /// same user on the same target
    pub async fn upsert(
        conn: &mut SqliteConnection,
        user_id: i64,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<Vote> {
        let sql = match target {
            VoteTarget::Queue(_) => {
                r#"
                INSERT INTO vote (user_id, queue_entry_id, history_entry_id, direction)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (user_id, queue_entry_id) DO UPDATE SET direction = excluded.direction
                RETURNING *
                "#
            }
            VoteTarget::History(_) => {
                r#"
                INSERT INTO vote (user_id, queue_entry_id, history_entry_id, direction)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (user_id, history_entry_id) DO UPDATE SET direction = excluded.direction
                RETURNING *
                "#
            }
        };
        let (queue_entry_id, history_entry_id) = target.columns();

        let row: VoteRow = sqlx::query_as(sql)
            .bind(user_id)
            .bind(queue_entry_id)
            .bind(history_entry_id)
            .bind(direction.value())
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)
            .map_err(|e| Error::from_write(e, "vote on", target.to_string()))?;

        row.into_vote()
            .ok_or_else(|| Error::ReferentialIntegrity(format!("malformed vote on {}", target)))
    }

    /// Get one user's vote on a target
    pub async fn get(
        conn: &mut SqliteConnection,
        user_id: i64,
        target: VoteTarget,
    ) -> Result<Option<Vote>> {
        let row: Option<VoteRow> = match target {
            VoteTarget::Queue(id) => {
                sqlx::query_as("SELECT * FROM vote WHERE user_id = ? AND queue_entry_id = ?")
                    .bind(user_id)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
                    .map(first_row)?
            }
            VoteTarget::History(id) => {
                sqlx::query_as("SELECT * FROM vote WHERE user_id = ? AND history_entry_id = ?")
                    .bind(user_id)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
                    .map(first_row)?
            }
        };

        Ok(row.and_then(|r| r.into_vote()))
    }

    /// All votes on a target, oldest first
    pub async fn for_target(conn: &mut SqliteConnection, target: VoteTarget) -> Result<Vec<Vote>> {
        let rows: Vec<VoteRow> = match target {
            VoteTarget::Queue(id) => {
                sqlx::query_as("SELECT * FROM vote WHERE queue_entry_id = ? ORDER BY id")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?
            }
            VoteTarget::History(id) => {
                sqlx::query_as("SELECT * FROM vote WHERE history_entry_id = ? ORDER BY id")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?
            }
        };

        Ok(rows.into_iter().filter_map(|r| r.into_vote()).collect())
    }

    /// Sum of vote directions on a target
    pub async fn tally(conn: &mut SqliteConnection, target: VoteTarget) -> Result<i64> {
        let row: (i64,) = match target {
            VoteTarget::Queue(id) => {
                sqlx::query_as("SELECT COALESCE(SUM(direction), 0) FROM vote WHERE queue_entry_id = ?")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
                    .and_then(single_row)?
            }
            VoteTarget::History(id) => {
                sqlx::query_as(
                    "SELECT COALESCE(SUM(direction), 0) FROM vote WHERE history_entry_id = ?",
                )
                .bind(id)
                .fetch_all(&mut *conn)
                .await
                .and_then(single_row)?
            }
        };

        Ok(row.0)
    }

    /// Move every vote on a queue entry over to a history entry
    pub async fn retarget_to_history(
        conn: &mut SqliteConnection,
        queue_entry_id: i64,
        history_entry_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE vote SET queue_entry_id = NULL, history_entry_id = ? WHERE queue_entry_id = ?",
        )
        .bind(history_entry_id)
        .bind(queue_entry_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_write(e, "votes on queue entry", queue_entry_id.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Get vote count
    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote")
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)?;

        Ok(row.0)
    }
}
