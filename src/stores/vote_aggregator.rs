//! Vote aggregator - one vote per user per queue or history entry

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::db::tables::{HistoryTable, QueueTable, VoteTable};
use crate::error::{Error, Result};
use crate::models::{Vote, VoteDirection, VoteTarget};

/// Access to the `vote` table.
///
/// Votes are never deleted; retracting sets the direction back to neutral.
#[derive(Debug, Clone)]
pub struct VoteAggregator {
    pool: SqlitePool,
}

impl VoteAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record `user_id`'s vote on `target`, replacing any earlier direction
    pub async fn cast_vote(
        &self,
        user_id: i64,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<Vote> {
        let mut conn = self.pool.acquire().await?;

        let exists = match target {
            VoteTarget::Queue(id) => QueueTable::get_by_id(&mut conn, id).await?.is_some(),
            VoteTarget::History(id) => HistoryTable::get_by_id(&mut conn, id).await?.is_some(),
        };
        if !exists {
            return Err(Error::ReferentialIntegrity(format!("{} does not exist", target)));
        }

        let vote = VoteTable::upsert(&mut conn, user_id, target, direction).await?;
        debug!(
            "User {} voted {} on {}",
            user_id,
            direction.value(),
            target
        );
        Ok(vote)
    }

    /// Set the user's vote on `target` back to neutral
    pub async fn retract_vote(&self, user_id: i64, target: VoteTarget) -> Result<Vote> {
        self.cast_vote(user_id, target, VoteDirection::Neutral).await
    }

    /// Sum of vote directions on `target`
    pub async fn tally(&self, target: VoteTarget) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        VoteTable::tally(&mut conn, target).await
    }

    /// Every vote on `target`
    pub async fn votes_for(&self, target: VoteTarget) -> Result<Vec<Vote>> {
        let mut conn = self.pool.acquire().await?;
        VoteTable::for_target(&mut conn, target).await
    }

    /// One user's vote on `target`, if they have voted
    pub async fn vote_of(&self, user_id: i64, target: VoteTarget) -> Result<Option<Vote>> {
        let mut conn = self.pool.acquire().await?;
        VoteTable::get(&mut conn, user_id, target).await
    }

    /// Re-point every vote on a queue entry at the history entry it became.
    ///
    /// Users and directions are kept. Must run in the same transaction as
    /// the dequeue and the history insert.
    pub async fn migrate_votes(
        &self,
        conn: &mut SqliteConnection,
        old_queue_entry: i64,
        new_history_entry: i64,
    ) -> Result<u64> {
        let moved = VoteTable::retarget_to_history(conn, old_queue_entry, new_history_entry).await?;
        debug!(
            "Moved {} votes from queue entry {} to history entry {}",
            moved, old_queue_entry, new_history_entry
        );
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_engine;
    use crate::db::tables::{TrackTable, UserTable};
    use crate::models::TrackMetadata;

    struct Fixture {
        _dir: tempfile::TempDir,
        pool: SqlitePool,
        votes: VoteAggregator,
        alice: i64,
        bob: i64,
        entry: i64,
    }

    async fn fixture() -> Fixture {
        let (dir, engine) = temp_engine().await;
        let pool = engine.pool().clone();
        let mut conn = pool.acquire().await.unwrap();

        let alice = UserTable::insert(&mut conn, "Alice", "alice", "x").await.unwrap().id;
        let bob = UserTable::insert(&mut conn, "Bob", "bob", "x").await.unwrap().id;
        let track = TrackTable::insert(&mut conn, "spotify:track:a", &TrackMetadata::default())
            .await
            .unwrap()
            .id;
        let entry = QueueTable::insert_next(&mut conn, track, Some(alice), None, 0)
            .await
            .unwrap()
            .id;
        drop(conn);

        Fixture {
            _dir: dir,
            votes: VoteAggregator::new(pool.clone()),
            pool,
            alice,
            bob,
            entry,
        }
    }

    #[tokio::test]
    async fn test_cast_vote_is_idempotent() {
        let f = fixture().await;
        let target = VoteTarget::Queue(f.entry);

        let first = f.votes.cast_vote(f.alice, target, VoteDirection::Up).await.unwrap();
        let second = f.votes.cast_vote(f.alice, target, VoteDirection::Up).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.votes.votes_for(target).await.unwrap().len(), 1);
        assert_eq!(f.votes.tally(target).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_revote_updates_in_place() {
        let f = fixture().await;
        let target = VoteTarget::Queue(f.entry);

        f.votes.cast_vote(f.alice, target, VoteDirection::Up).await.unwrap();
        f.votes.cast_vote(f.bob, target, VoteDirection::Down).await.unwrap();
        assert_eq!(f.votes.tally(target).await.unwrap(), 0);

        f.votes.cast_vote(f.bob, target, VoteDirection::Up).await.unwrap();
        assert_eq!(f.votes.tally(target).await.unwrap(), 2);

        f.votes.retract_vote(f.alice, target).await.unwrap();
        assert_eq!(f.votes.tally(target).await.unwrap(), 1);

        let alice_vote = f.votes.vote_of(f.alice, target).await.unwrap().unwrap();
        assert_eq!(alice_vote.direction, VoteDirection::Neutral);
        assert_eq!(f.votes.votes_for(target).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_vote_on_entry_written_by_another_connection() {
        let f = fixture().await;
        let mut writer = f.pool.acquire().await.unwrap();
        let track = TrackTable::insert(&mut writer, "spotify:track:b", &TrackMetadata::default())
            .await
            .unwrap()
            .id;
        let entry = QueueTable::insert_next(&mut writer, track, Some(f.bob), None, 0)
            .await
            .unwrap()
            .id;

        // `writer` stays checked out, so the vote runs elsewhere
        let vote = f
            .votes
            .cast_vote(f.alice, VoteTarget::Queue(entry), VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(vote.target, VoteTarget::Queue(entry));
        assert_eq!(VoteTable::tally(&mut writer, VoteTarget::Queue(entry)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_vote_on_missing_target() {
        let f = fixture().await;

        for target in [VoteTarget::Queue(999), VoteTarget::History(999)] {
            let err = f
                .votes
                .cast_vote(f.alice, target, VoteDirection::Up)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::ReferentialIntegrity(_)), "{:?}", target);
        }
    }

    #[tokio::test]
    async fn test_vote_by_missing_user() {
        let f = fixture().await;

        let err = f
            .votes
            .cast_vote(999, VoteTarget::Queue(f.entry), VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));
    }

    #[tokio::test]
    async fn test_tally_of_unvoted_target_is_zero() {
        let f = fixture().await;
        assert_eq!(f.votes.tally(VoteTarget::History(5)).await.unwrap(), 0);
        assert!(f
            .votes
            .vote_of(f.alice, VoteTarget::Queue(f.entry))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_migrate_votes_keeps_users_and_directions() {
        let f = fixture().await;
        let queue_target = VoteTarget::Queue(f.entry);
        f.votes.cast_vote(f.alice, queue_target, VoteDirection::Up).await.unwrap();
        f.votes.cast_vote(f.bob, queue_target, VoteDirection::Down).await.unwrap();

        let mut tx = f.pool.begin().await.unwrap();
        let played = QueueTable::delete_returning(&mut tx, f.entry).await.unwrap().unwrap();
        let history = HistoryTable::insert(&mut tx, played.track_id, played.user_id, 1)
            .await
            .unwrap();
        let moved = f.votes.migrate_votes(&mut tx, f.entry, history.id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(moved, 2);
        let history_target = VoteTarget::History(history.id);
        let mut pairs: Vec<(i64, i64)> = f
            .votes
            .votes_for(history_target)
            .await
            .unwrap()
            .iter()
            .map(|v| (v.user_id, v.direction.value()))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(f.alice, 1), (f.bob, -1)]);
        assert!(f.votes.votes_for(queue_target).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_voted_entry_without_migration_fails() {
        let f = fixture().await;
        f.votes
            .cast_vote(f.alice, VoteTarget::Queue(f.entry), VoteDirection::Up)
            .await
            .unwrap();

        let mut tx = f.pool.begin().await.unwrap();
        QueueTable::delete_returning(&mut tx, f.entry).await.unwrap();
        // the dangling vote is caught when the transaction commits
        assert!(tx.commit().await.is_err());

        let mut conn = f.pool.acquire().await.unwrap();
        assert!(QueueTable::get_by_id(&mut conn, f.entry).await.unwrap().is_some());
    }
}
