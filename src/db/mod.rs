//! Database module for Partify
//!
//! This module handles all database operations using SQLx with SQLite.

mod engine;
mod migrations;
pub mod tables;

pub use engine::{setup_sqlite, DbEngine};
pub use migrations::run_migrations;

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for database-backed tests

    use super::DbEngine;
    use tempfile::TempDir;

    /// A freshly migrated database in a temporary directory. Keep the
    /// returned `TempDir` alive for as long as the engine is used.
    pub async fn temp_engine() -> (TempDir, DbEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = DbEngine::open(&temp_dir.path().join("partify.db"))
            .await
            .unwrap();
        super::run_migrations(engine.pool()).await.unwrap();
        (temp_dir, engine)
    }
}
