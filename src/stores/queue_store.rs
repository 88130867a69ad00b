//! Priority queue store - the live queue of tracks waiting to play
//!
//! Queue order is never cached: every listing is read back from the
//! `queue_entry` table ordered by `(playback_priority, id)`.
//!
//! New entries get `max + 1` for both priority columns. With
//! [`PriorityStrategy::Naive`] the maximum is read in one statement and the
//! row inserted in another, so two concurrent enqueues can end up sharing a
//! priority. [`PriorityStrategy::Serialized`] routes every queue write
//! through one async mutex and computes the maximum inside the inserting
//! statement, which makes priorities unique under concurrent enqueue.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::db::tables::{QueueTable, TrackTable, UserTable};
use crate::error::{Error, Result};
use crate::models::{BackendSlot, PriorityStrategy, QueueEntry};
use crate::serializers::QueueEntryView;
use crate::utils::dates::now_timestamp;

/// Outcome of a slot reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries whose slot id was dropped
    pub cleared: usize,
    /// Entries that picked up a slot id
    pub assigned: usize,
}

/// The live queue
#[derive(Debug, Clone)]
pub struct QueueStore {
    pool: SqlitePool,
    strategy: PriorityStrategy,
    writer: Arc<Mutex<()>>,
}

impl QueueStore {
    pub fn new(pool: SqlitePool, strategy: PriorityStrategy) -> Self {
        Self {
            pool,
            strategy,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn strategy(&self) -> PriorityStrategy {
        self.strategy
    }

    /// Hold the single-writer lock while mutating the queue. Always `None`
    /// under the naive strategy.
    pub async fn write_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match self.strategy {
            PriorityStrategy::Naive => None,
            PriorityStrategy::Serialized => Some(self.writer.lock().await),
        }
    }

    /// Add a track to the end of the queue
    pub async fn enqueue(
        &self,
        track_id: i64,
        user_id: Option<i64>,
        backend_slot_id: Option<i64>,
    ) -> Result<QueueEntry> {
        let time_added = now_timestamp();

        let entry = match self.strategy {
            PriorityStrategy::Naive => {
                // two autocommit statements: another enqueue may read the
                // same maximum before this insert lands
                let mut conn = self.pool.acquire().await?;
                let priorities = QueueTable::next_priorities(&mut conn).await?;
                QueueTable::insert(
                    &mut conn,
                    track_id,
                    user_id,
                    backend_slot_id,
                    time_added,
                    priorities,
                )
                .await?
            }
            PriorityStrategy::Serialized => {
                let _guard = self.writer.lock().await;
                let mut tx = self.pool.begin().await?;
                let entry = QueueTable::insert_next(
                    &mut tx,
                    track_id,
                    user_id,
                    backend_slot_id,
                    time_added,
                )
                .await
                .map_err(Error::aborted)?;
                tx.commit().await.map_err(Error::TransactionAborted)?;
                entry
            }
        };

        info!(
            "Enqueued track {} as entry {} (priority {}/{})",
            entry.track_id, entry.id, entry.user_priority, entry.playback_priority
        );
        Ok(entry)
    }

    /// Move an entry to a new playback priority. Nothing else is renumbered,
    /// so gaps and ties are possible.
    ///
    /// `i64::MAX` is refused: the next enqueue would have no priority left.
    pub async fn reorder(&self, entry_id: i64, new_playback_priority: i64) -> Result<QueueEntry> {
        if new_playback_priority == i64::MAX {
            return Err(Error::PriorityOverflow(new_playback_priority));
        }

        let _guard = self.write_guard().await;
        let mut conn = self.pool.acquire().await?;

        let entry = QueueTable::set_playback_priority(&mut conn, entry_id, new_playback_priority)
            .await?
            .ok_or_else(|| missing_entry(entry_id))?;

        debug!("Entry {} now at playback priority {}", entry_id, new_playback_priority);
        Ok(entry)
    }

    /// Remove an entry and return the removed row.
    ///
    /// Runs on the caller's connection so it can share a transaction with
    /// recording the play and moving the entry's votes. Callers using the
    /// serialized strategy should hold [`write_guard`](Self::write_guard).
    pub async fn dequeue(&self, conn: &mut SqliteConnection, entry_id: i64) -> Result<QueueEntry> {
        QueueTable::delete_returning(conn, entry_id)
            .await?
            .ok_or_else(|| missing_entry(entry_id))
    }

    /// The queue in playback order
    pub async fn list_ordered(&self) -> Result<Vec<QueueEntry>> {
        let mut conn = self.pool.acquire().await?;
        QueueTable::list_ordered(&mut conn).await
    }

    pub async fn get(&self, entry_id: i64) -> Result<Option<QueueEntry>> {
        let mut conn = self.pool.acquire().await?;
        QueueTable::get_by_id(&mut conn, entry_id).await
    }

    pub async fn len(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        QueueTable::count(&mut conn).await
    }

    /// Flatten an entry together with its track and user
    pub async fn to_external_view(&self, entry: &QueueEntry) -> Result<QueueEntryView> {
        let mut conn = self.pool.acquire().await?;

        let track = TrackTable::get_by_id(&mut conn, entry.track_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", entry.track_id)))?;
        let user = match entry.user_id {
            Some(id) => UserTable::get_by_id(&mut conn, id).await?,
            None => None,
        };

        Ok(QueueEntryView::new(entry, &track, user.as_ref()))
    }

    /// The whole queue as external views, in playback order
    pub async fn external_queue(&self) -> Result<Vec<QueueEntryView>> {
        let entries = self.list_ordered().await?;
        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            views.push(self.to_external_view(entry).await?);
        }
        Ok(views)
    }

    /// Record the backend slot id for an entry
    pub async fn assign_slot(&self, entry_id: i64, backend_slot_id: Option<i64>) -> Result<()> {
        let _guard = self.write_guard().await;
        let mut conn = self.pool.acquire().await?;

        if !QueueTable::set_slot(&mut conn, entry_id, backend_slot_id).await? {
            return Err(missing_entry(entry_id));
        }
        Ok(())
    }

    /// Find the entry the backend knows as `backend_slot_id`.
    ///
    /// If stale data left the slot on several entries, the one that plays
    /// first wins. No match is `BestEffortMismatch`.
    pub async fn find_by_slot(&self, backend_slot_id: i64) -> Result<QueueEntry> {
        let mut conn = self.pool.acquire().await?;
        QueueTable::find_by_slot(&mut conn, backend_slot_id)
            .await?
            .ok_or(Error::BestEffortMismatch {
                slot_id: backend_slot_id,
            })
    }

    /// Bring slot ids in line with the backend's current playlist.
    ///
    /// Slot ids the backend no longer reports, that now hold a different
    /// track, or that are already claimed by an earlier entry are cleared.
    /// Entries without a slot then take the first unclaimed backend slot
    /// holding the same track, in queue order.
    pub async fn reconcile_slots(&self, backend: &[BackendSlot]) -> Result<ReconcileReport> {
        let _guard = self.write_guard().await;
        let mut tx = self.pool.begin().await?;

        let backend_urls: HashMap<i64, &str> = backend
            .iter()
            .map(|s| (s.slot_id, s.spotify_url.as_str()))
            .collect();
        let mut rows = QueueTable::list_slots(&mut tx).await.map_err(Error::aborted)?;
        let mut claimed: HashSet<i64> = HashSet::new();
        let mut report = ReconcileReport::default();

        for row in rows.iter_mut() {
            let Some(slot_id) = row.backend_slot_id else {
                continue;
            };
            let matches = backend_urls.get(&slot_id) == Some(&row.spotify_url.as_str());
            if !matches || !claimed.insert(slot_id) {
                QueueTable::set_slot(&mut tx, row.id, None)
                    .await
                    .map_err(Error::aborted)?;
                row.backend_slot_id = None;
                report.cleared += 1;
            }
        }

        for row in rows.iter().filter(|r| r.backend_slot_id.is_none()) {
            let free = backend
                .iter()
                .find(|s| s.spotify_url == row.spotify_url && !claimed.contains(&s.slot_id));
            if let Some(slot) = free {
                QueueTable::set_slot(&mut tx, row.id, Some(slot.slot_id))
                    .await
                    .map_err(Error::aborted)?;
                claimed.insert(slot.slot_id);
                report.assigned += 1;
            }
        }

        tx.commit().await.map_err(Error::TransactionAborted)?;

        if report.cleared > 0 {
            warn!("Cleared {} stale backend slot ids", report.cleared);
        }
        debug!("Slot reconciliation: {:?}", report);
        Ok(report)
    }
}

fn missing_entry(entry_id: i64) -> Error {
    Error::ReferentialIntegrity(format!("queue entry {} does not exist", entry_id))
}
