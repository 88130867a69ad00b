//! Play history ledger - append-only log of played tracks

use futures::stream::BoxStream;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::db::tables::{HistoryFilter, HistoryTable};
use crate::error::Result;
use crate::models::{PlayHistoryEntry, TrackPlayCount, UserPlayCount};
use crate::utils::dates::now_timestamp;

/// Append-only access to the `play_history` table
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    pool: SqlitePool,
}

impl HistoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a play of `track_id` stamped with the current time
    pub async fn record(&self, track_id: i64, user_id: Option<i64>) -> Result<PlayHistoryEntry> {
        let mut conn = self.pool.acquire().await?;
        self.record_in(&mut conn, track_id, user_id).await
    }

    /// Same as [`record`](Self::record) but on a caller-owned connection,
    /// usually a transaction
    pub async fn record_in(
        &self,
        conn: &mut SqliteConnection,
        track_id: i64,
        user_id: Option<i64>,
    ) -> Result<PlayHistoryEntry> {
        let entry = HistoryTable::insert(conn, track_id, user_id, now_timestamp()).await?;
        debug!("Recorded play {} of track {}", entry.id, track_id);
        Ok(entry)
    }

    pub async fn get(&self, id: i64) -> Result<Option<PlayHistoryEntry>> {
        let mut conn = self.pool.acquire().await?;
        HistoryTable::get_by_id(&mut conn, id).await
    }

    /// Plays of one track, newest first
    pub fn history_for_track(&self, track_id: i64) -> HistoryQuery<'_> {
        HistoryQuery {
            pool: &self.pool,
            filter: HistoryFilter::Track(track_id),
        }
    }

    /// Plays queued by one user, newest first
    pub fn history_for_user(&self, user_id: i64) -> HistoryQuery<'_> {
        HistoryQuery {
            pool: &self.pool,
            filter: HistoryFilter::User(user_id),
        }
    }

    /// Every play, newest first
    pub fn all(&self) -> HistoryQuery<'_> {
        HistoryQuery {
            pool: &self.pool,
            filter: HistoryFilter::All,
        }
    }

    pub async fn count_for_track(&self, track_id: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        HistoryTable::count_for_track(&mut conn, track_id).await
    }

    pub async fn most_played_tracks(&self, limit: i64) -> Result<Vec<TrackPlayCount>> {
        let mut conn = self.pool.acquire().await?;
        HistoryTable::most_played_tracks(&mut conn, limit).await
    }

    pub async fn most_active_users(&self, limit: i64) -> Result<Vec<UserPlayCount>> {
        let mut conn = self.pool.acquire().await?;
        HistoryTable::most_active_users(&mut conn, limit).await
    }
}

/// A history listing that has not been read yet.
///
/// Nothing touches the database until [`stream`](Self::stream) is polled, and
/// every call to `stream` starts again from the newest row.
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery<'a> {
    pool: &'a SqlitePool,
    filter: HistoryFilter,
}

impl<'a> HistoryQuery<'a> {
    pub fn stream(&self) -> BoxStream<'a, Result<PlayHistoryEntry>> {
        HistoryTable::stream(self.pool, self.filter)
    }

    /// Drain the stream into a Vec
    pub async fn collect(&self) -> Result<Vec<PlayHistoryEntry>> {
        use futures::TryStreamExt;
        self.stream().try_collect().await
    }
}
