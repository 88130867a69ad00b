//! Track table operations

use sqlx::{FromRow, SqliteConnection};
use super::{first_row, single_row};

use crate::error::{Error, Result};
use crate::models::{Track, TrackMetadata};

/// Database row for track table
#[derive(Debug, FromRow)]
struct TrackRow {
    id: i64,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    length: Option<i64>,
    date: Option<String>,
    spotify_url: String,
}

impl TrackRow {
    fn into_track(self) -> Track {
        Track {
            id: self.id,
            title: self.title,
            artist: self.artist,
            album: self.album,
            length: self.length,
            date: self.date,
            spotify_url: self.spotify_url,
        }
    }
}

/// Track table operations
pub struct TrackTable;

impl TrackTable {
    /// Get track by catalog URL
    pub async fn get_by_url(conn: &mut SqliteConnection, spotify_url: &str) -> Result<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as("SELECT * FROM track WHERE spotify_url = ?")
            .bind(spotify_url)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_track()))
    }

    /// Get track by ID
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as("SELECT * FROM track WHERE id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map(first_row)?;

        Ok(row.map(|r| r.into_track()))
    }

    /// Insert a track. Fails with `DuplicateKey` if the URL is already present.
    pub async fn insert(
        conn: &mut SqliteConnection,
        spotify_url: &str,
        metadata: &TrackMetadata,
    ) -> Result<Track> {
        let row: TrackRow = sqlx::query_as(
            "INSERT INTO track (title, artist, album, length, date, spotify_url) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&metadata.title)
        .bind(&metadata.artist)
        .bind(&metadata.album)
        .bind(metadata.length)
        .bind(&metadata.date)
        .bind(spotify_url)
        .fetch_all(&mut *conn)
        .await
        .and_then(single_row)
        .map_err(|e| Error::from_write(e, "track", spotify_url))?;

        Ok(row.into_track())
    }

    /// Fill in metadata columns that are still NULL. Present values are kept.
    pub async fn backfill(
        conn: &mut SqliteConnection,
        spotify_url: &str,
        metadata: &TrackMetadata,
    ) -> Result<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as(
            r#"
            UPDATE track SET
                title = COALESCE(title, ?),
                artist = COALESCE(artist, ?),
                album = COALESCE(album, ?),
                length = COALESCE(length, ?),
                date = COALESCE(date, ?)
            WHERE spotify_url = ?
            RETURNING *
            "#,
        )
        .bind(&metadata.title)
        .bind(&metadata.artist)
        .bind(&metadata.album)
        .bind(metadata.length)
        .bind(&metadata.date)
        .bind(spotify_url)
        .fetch_all(&mut *conn)
        .await
        .map(first_row)?;

        Ok(row.map(|r| r.into_track()))
    }

    /// Get track count
    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM track")
            .fetch_all(&mut *conn)
            .await
            .and_then(single_row)?;

        Ok(row.0)
    }
}
