//! Database engine and connection management

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::Paths;

static DB_ENGINE: OnceCell<Arc<DbEngine>> = OnceCell::new();

/// Database engine wrapper
#[derive(Debug, Clone)]
pub struct DbEngine {
    pool: SqlitePool,
}

impl DbEngine {
    /// Get the global database engine instance
    pub fn get() -> Result<Arc<DbEngine>> {
        DB_ENGINE
            .get()
            .map(Arc::clone)
            .context("Database not initialized")
    }

    /// Open (or create) a database at an explicit path and make sure the
    /// schema exists. Does not touch the global instance.
    pub async fn open(db_path: &Path) -> Result<DbEngine> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .pragma("cache_size", "10000")
            .pragma("foreign_keys", "ON")
            .pragma("temp_store", "FILE");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let engine = DbEngine { pool };
        engine.create_tables().await?;

        Ok(engine)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all database tables
    async fn create_tables(&self) -> Result<()> {
        let pool = self.pool();

        // Track table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS track (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                artist TEXT,
                album TEXT,
                length INTEGER,
                date TEXT,
                spotify_url TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // User table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                privs INTEGER NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_user_username ON user(username);
            "#,
        )
        .execute(pool)
        .await?;

        // Queue table. backend_slot_id may repeat until slots are reconciled.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_entry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                track_id INTEGER NOT NULL REFERENCES track(id),
                user_id INTEGER REFERENCES user(id),
                backend_slot_id INTEGER,
                time_added INTEGER NOT NULL,
                user_priority INTEGER NOT NULL,
                playback_priority INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_queue_entry_playback ON queue_entry(playback_priority, id);
            CREATE INDEX IF NOT EXISTS idx_queue_entry_slot ON queue_entry(backend_slot_id);
            "#,
        )
        .execute(pool)
        .await?;

        // History table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS play_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                track_id INTEGER NOT NULL REFERENCES track(id),
                user_id INTEGER REFERENCES user(id),
                time_played INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_play_history_track ON play_history(track_id);
            CREATE INDEX IF NOT EXISTS idx_play_history_user ON play_history(user_id);
            CREATE INDEX IF NOT EXISTS idx_play_history_time ON play_history(time_played);
            "#,
        )
        .execute(pool)
        .await?;

        // Vote table. Exactly one of the two target columns is set; the
        // target foreign keys are checked at commit so a played queue entry
        // can be deleted before its votes are re-pointed.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vote (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES user(id),
                queue_entry_id INTEGER
                    REFERENCES queue_entry(id) DEFERRABLE INITIALLY DEFERRED,
                history_entry_id INTEGER
                    REFERENCES play_history(id) DEFERRABLE INITIALLY DEFERRED,
                direction INTEGER NOT NULL DEFAULT 0 CHECK (direction IN (-1, 0, 1)),
                CHECK ((queue_entry_id IS NULL) <> (history_entry_id IS NULL))
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_vote_user_queue ON vote(user_id, queue_entry_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_vote_user_history ON vote(user_id, history_entry_id);
            "#,
        )
        .execute(pool)
        .await?;

        // Migration table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dbmigration (
                id INTEGER PRIMARY KEY,
                version INTEGER NOT NULL DEFAULT 0
            );
            INSERT OR IGNORE INTO dbmigration (id, version) VALUES (1, 0);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Setup the SQLite database under the configured paths and install it as
/// the global engine
pub async fn setup_sqlite() -> Result<Arc<DbEngine>> {
    let paths = Paths::get()?;
    let db_path = paths.app_db_path();

    info!("Opening database at {}", db_path.display());
    let engine = Arc::new(DbEngine::open(&db_path).await?);

    DB_ENGINE
        .set(Arc::clone(&engine))
        .map_err(|_| anyhow::anyhow!("Database already initialized"))?;

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DbEngine::open(&temp_dir.path().join("test.db")).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(engine.pool())
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();

        assert_eq!(
            names,
            vec!["dbmigration", "play_history", "queue_entry", "track", "user", "vote"]
        );
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.db");
        let first = DbEngine::open(&path).await.unwrap();
        drop(first);
        assert!(DbEngine::open(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_vote_target_check_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DbEngine::open(&temp_dir.path().join("test.db")).await.unwrap();

        sqlx::query("INSERT INTO user (name, username, password) VALUES ('A', 'a', 'x')")
            .execute(engine.pool())
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO vote (user_id, queue_entry_id, history_entry_id, direction) VALUES (1, NULL, NULL, 1)",
        )
        .execute(engine.pool())
        .await;
        assert!(result.is_err());
    }
}
