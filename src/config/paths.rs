//! Filesystem locations
//!
//! Partify keeps its database and settings side by side in one directory:
//! `--config` when given, otherwise the platform config dir.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PATHS: OnceCell<Arc<Paths>> = OnceCell::new();

const DB_FILE: &str = "partify.db";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
}

impl Paths {
    /// Resolve and create the config directory once for the process
    pub fn init(config: Option<PathBuf>) -> Result<Arc<Paths>> {
        PATHS
            .get_or_try_init(|| Self::resolve(config).map(Arc::new))
            .map(Arc::clone)
    }

    /// The instance set up by [`init`](Self::init)
    pub fn get() -> Result<Arc<Paths>> {
        PATHS
            .get()
            .cloned()
            .context("Paths::init has not been called")
    }

    fn resolve(config_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_override {
            Some(dir) => dir,
            None => directories::ProjectDirs::from("", "", "partify")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .context("No home directory; pass --config")?,
        };
        Self::at(config_dir)
    }

    /// Use `config_dir` as is, creating it if needed
    pub fn at(config_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn app_db_path(&self) -> PathBuf {
        self.config_dir.join(DB_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}
