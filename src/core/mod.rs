//! Core library logic for Partify
//!
//! [`Jukebox`] wires the stores to one database and adds the flows that
//! span more than one of them.

pub mod playback;

use tracing::debug;

use crate::db::DbEngine;
use crate::error::{Error, Result};
use crate::models::{PriorityStrategy, QueueEntry, TrackMetadata, VoteTarget};
use crate::serializers::HistoryEntryView;
use crate::stores::{HistoryLedger, IdentityStore, QueueStore, TrackCatalog, VoteAggregator};

pub use playback::PlaybackService;

/// All stores over one database
#[derive(Debug, Clone)]
pub struct Jukebox {
    pub catalog: TrackCatalog,
    pub identity: IdentityStore,
    pub queue: QueueStore,
    pub history: HistoryLedger,
    pub votes: VoteAggregator,
    pub playback: PlaybackService,
}

impl Jukebox {
    pub fn new(engine: &DbEngine, strategy: PriorityStrategy) -> Self {
        let pool = engine.pool().clone();

        let queue = QueueStore::new(pool.clone(), strategy);
        let history = HistoryLedger::new(pool.clone());
        let votes = VoteAggregator::new(pool.clone());
        let playback =
            PlaybackService::new(pool.clone(), queue.clone(), history.clone(), votes.clone());

        Self {
            catalog: TrackCatalog::new(pool.clone()),
            identity: IdentityStore::new(pool),
            queue,
            history,
            votes,
            playback,
        }
    }

    /// Catalog the track if it is new, then put it at the end of the queue
    pub async fn enqueue_track(
        &self,
        catalog_url: &str,
        metadata: &TrackMetadata,
        user_id: Option<i64>,
        backend_slot_id: Option<i64>,
    ) -> Result<QueueEntry> {
        let track = self.catalog.get_or_create(catalog_url, metadata).await?;
        debug!("Queueing {}", track);
        self.queue.enqueue(track.id, user_id, backend_slot_id).await
    }

    /// Flatten a history entry for display, with its current tally
    pub async fn history_view(&self, history_id: i64) -> Result<HistoryEntryView> {
        let entry = self
            .history
            .get(history_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("history entry {}", history_id)))?;
        let track = self
            .catalog
            .get_by_id(entry.track_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", entry.track_id)))?;
        let user = match entry.user_id {
            Some(id) => self.identity.get_by_id(id).await?,
            None => None,
        };
        let tally = self.votes.tally(VoteTarget::History(entry.id)).await?;

        Ok(HistoryEntryView::new(&entry, &track, user.as_ref(), tally))
    }
}
