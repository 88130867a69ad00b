//! Database migrations
//!
//! `DbEngine::open` creates the baseline schema. Later schema changes are
//! listed here and tracked by the single row in `dbmigration`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Step `i` moves the database from version `i` to `i + 1`
const MIGRATIONS: &[(&str, &str)] = &[
    ("baseline", ""),
    (
        "index votes by target",
        r#"
        CREATE INDEX IF NOT EXISTS idx_vote_queue_entry ON vote(queue_entry_id);
        CREATE INDEX IF NOT EXISTS idx_vote_history_entry ON vote(history_entry_id);
        "#,
    ),
];

/// Schema version this build expects
pub fn latest_version() -> i32 {
    MIGRATIONS.len() as i32
}

/// Apply every migration newer than the stored version, one transaction each
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let stored = get_migration_version(pool).await?;
    let latest = latest_version();

    if stored > latest {
        warn!(
            "Database schema version {} is newer than this build ({})",
            stored, latest
        );
        return Ok(());
    }
    if stored == latest {
        debug!("Database schema at version {}", stored);
        return Ok(());
    }

    for (step, (name, sql)) in MIGRATIONS.iter().enumerate().skip(stored as usize) {
        let version = step as i32 + 1;
        let mut tx = pool.begin().await?;

        if !sql.trim().is_empty() {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Migration {} ({}) failed", version, name))?;
        }
        sqlx::query("UPDATE dbmigration SET version = ? WHERE id = 1")
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Migrated database to version {}: {}", version, name);
    }

    Ok(())
}

/// Schema version recorded in the database
pub async fn get_migration_version(pool: &SqlitePool) -> Result<i32> {
    let versions: Vec<i32> = sqlx::query_scalar("SELECT version FROM dbmigration WHERE id = 1")
        .fetch_all(pool)
        .await
        .context("Failed to read schema version")?;

    versions
        .into_iter()
        .next()
        .context("dbmigration row is missing")
}
