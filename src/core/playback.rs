//! Playback bookkeeping
//!
//! Turning a queue entry into a history entry touches three tables: the
//! queue row is deleted, a history row is inserted, and the entry's votes are
//! re-pointed at the new history row. All three happen in one transaction.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{PlayHistoryEntry, QueueEntry};
use crate::stores::{HistoryLedger, QueueStore, VoteAggregator};

/// What a consumed queue entry turned into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayedEntry {
    /// The queue row as it was when removed
    pub entry: QueueEntry,
    pub history: PlayHistoryEntry,
    pub votes_moved: u64,
}

/// Applies playback backend events to the queue and history
#[derive(Debug, Clone)]
pub struct PlaybackService {
    pool: SqlitePool,
    queue: QueueStore,
    history: HistoryLedger,
    votes: VoteAggregator,
}

impl PlaybackService {
    pub fn new(
        pool: SqlitePool,
        queue: QueueStore,
        history: HistoryLedger,
        votes: VoteAggregator,
    ) -> Self {
        Self {
            pool,
            queue,
            history,
            votes,
        }
    }

    /// Dequeue `entry_id`, record the play and move its votes, all or nothing
    pub async fn consume(&self, entry_id: i64) -> Result<PlayedEntry> {
        let _guard = self.queue.write_guard().await;
        let mut tx = self.pool.begin().await.map_err(Error::TransactionAborted)?;

        let entry = self
            .queue
            .dequeue(&mut tx, entry_id)
            .await
            .map_err(Error::aborted)?;
        let history = self
            .history
            .record_in(&mut tx, entry.track_id, entry.user_id)
            .await
            .map_err(Error::aborted)?;
        let votes_moved = self
            .votes
            .migrate_votes(&mut tx, entry.id, history.id)
            .await
            .map_err(Error::aborted)?;

        tx.commit().await.map_err(Error::TransactionAborted)?;

        info!(
            "Played queue entry {} (track {}) as history entry {}, {} votes moved",
            entry.id, entry.track_id, history.id, votes_moved
        );
        Ok(PlayedEntry {
            entry,
            history,
            votes_moved,
        })
    }

    /// The backend started playing `slot_id`.
    ///
    /// An unknown slot is logged and ignored; playback goes on without queue
    /// bookkeeping.
    pub async fn track_started(&self, slot_id: i64) -> Result<Option<PlayedEntry>> {
        let entry = match self.queue.find_by_slot(slot_id).await {
            Ok(entry) => entry,
            Err(err @ Error::BestEffortMismatch { .. }) => {
                warn!("{}, not recording play", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match self.consume(entry.id).await {
            Ok(played) => Ok(Some(played)),
            Err(Error::ReferentialIntegrity(msg)) => {
                // someone else consumed it between the lookup and the delete
                warn!("Backend slot {} went away: {}", slot_id, msg);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// The backend finished `slot_id`.
    ///
    /// Normally the entry was consumed when it started. If the start event
    /// was missed, the entry is consumed now.
    pub async fn track_finished(&self, slot_id: i64) -> Result<Option<PlayedEntry>> {
        match self.queue.find_by_slot(slot_id).await {
            Ok(entry) => {
                debug!(
                    "Slot {} finished while entry {} was still queued",
                    slot_id, entry.id
                );
                self.track_started(slot_id).await
            }
            Err(Error::BestEffortMismatch { .. }) => {
                debug!("Slot {} finished", slot_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
