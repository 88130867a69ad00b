//! Track catalog - durable cache of every track ever queued

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::tables::TrackTable;
use crate::error::{Error, Result};
use crate::models::{Track, TrackMetadata};

/// Lookup-or-insert access to the `track` table
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    pool: SqlitePool,
}

impl TrackCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the track stored under `catalog_url`, inserting it first if
    /// needed. An existing row keeps its metadata.
    ///
    /// If another writer inserts the same URL between the lookup and the
    /// insert, the lookup is retried once.
    pub async fn get_or_create(&self, catalog_url: &str, metadata: &TrackMetadata) -> Result<Track> {
        let mut conn = self.pool.acquire().await?;

        if let Some(track) = TrackTable::get_by_url(&mut conn, catalog_url).await? {
            return Ok(track);
        }

        match TrackTable::insert(&mut conn, catalog_url, metadata).await {
            Ok(track) => {
                debug!("Cataloged {}", track);
                Ok(track)
            }
            Err(err) if err.is_duplicate() => {
                debug!("Lost insert race for {}, reading it back", catalog_url);
                TrackTable::get_by_url(&mut conn, catalog_url)
                    .await?
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Fill in metadata the catalog did not have yet
    pub async fn backfill(&self, catalog_url: &str, metadata: &TrackMetadata) -> Result<Track> {
        let mut conn = self.pool.acquire().await?;

        TrackTable::backfill(&mut conn, catalog_url, metadata)
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", catalog_url)))
    }

    pub async fn get_by_url(&self, catalog_url: &str) -> Result<Option<Track>> {
        let mut conn = self.pool.acquire().await?;
        TrackTable::get_by_url(&mut conn, catalog_url).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Track>> {
        let mut conn = self.pool.acquire().await?;
        TrackTable::get_by_id(&mut conn, id).await
    }

    pub async fn count(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        TrackTable::count(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_engine;

    const URL: &str = "spotify:track:4uLU6hMCjMI75M1A2tKUQC";

    #[tokio::test]
    async fn test_get_or_create_is_first_write_wins() {
        let (_dir, engine) = temp_engine().await;
        let catalog = TrackCatalog::new(engine.pool().clone());

        let first = catalog
            .get_or_create(URL, &TrackMetadata::new("Never Gonna Give You Up", "Rick Astley", "Whenever You Need Somebody"))
            .await
            .unwrap();
        let second = catalog
            .get_or_create(URL, &TrackMetadata::new("Something Else", "Someone", "Nothing"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(catalog.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_classified() {
        let (_dir, engine) = temp_engine().await;
        let mut conn = engine.pool().acquire().await.unwrap();

        TrackTable::insert(&mut conn, URL, &TrackMetadata::default())
            .await
            .unwrap();
        let err = TrackTable::insert(&mut conn, URL, &TrackMetadata::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { entity: "track", .. }));
    }

    #[tokio::test]
    async fn test_backfill_only_fills_missing() {
        let (_dir, engine) = temp_engine().await;
        let catalog = TrackCatalog::new(engine.pool().clone());

        let meta = TrackMetadata {
            title: Some("Mr. Blue Sky".into()),
            ..Default::default()
        };
        let track = catalog.get_or_create(URL, &meta).await.unwrap();
        assert!(track.needs_backfill());

        let fuller = TrackMetadata::new("Wrong Title", "Electric Light Orchestra", "Out of the Blue")
            .with_length(303)
            .with_date("1977");
        let track = catalog.backfill(URL, &fuller).await.unwrap();

        assert_eq!(track.title.as_deref(), Some("Mr. Blue Sky"));
        assert_eq!(track.artist.as_deref(), Some("Electric Light Orchestra"));
        assert_eq!(track.length, Some(303));
        assert!(!track.needs_backfill());
    }

    #[tokio::test]
    async fn test_backfill_unknown_track() {
        let (_dir, engine) = temp_engine().await;
        let catalog = TrackCatalog::new(engine.pool().clone());

        let err = catalog
            .backfill("spotify:track:missing", &TrackMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_converges() {
        let (_dir, engine) = temp_engine().await;
        let catalog = TrackCatalog::new(engine.pool().clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = catalog.clone();
                tokio::spawn(async move {
                    catalog
                        .get_or_create(URL, &TrackMetadata::new("t", "a", "b"))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(catalog.count().await.unwrap(), 1);
    }
}
