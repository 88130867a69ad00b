//! Server configuration for Partify
//!
//! Settings are layered: built-in defaults, then `settings.json` in the
//! config directory, then `PARTIFY_*` environment variables.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::Paths;
use crate::models::PriorityStrategy;

static SERVER_CONFIG: OnceCell<Arc<RwLock<ServerConfig>>> = OnceCell::new();

/// HTTP server implementation to run the web front end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTechnology {
    #[default]
    Tornado,
    Builtin,
}

/// Server configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host of the MPD playback backend
    pub mpd_server_hostname: String,

    pub mpd_server_port: u16,

    /// Address the web front end binds to
    pub server_host: String,

    pub server_port: u16,

    pub server: ServerTechnology,

    pub lastfm_api_key: Option<String>,

    pub lastfm_api_secret: Option<String>,

    /// How new queue entries get their priorities
    pub priority_strategy: PriorityStrategy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mpd_server_hostname: "localhost".to_string(),
            mpd_server_port: 6600,
            server_host: "0.0.0.0".to_string(),
            server_port: 9292,
            server: ServerTechnology::default(),
            lastfm_api_key: None,
            lastfm_api_secret: None,
            priority_strategy: PriorityStrategy::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the settings file in the config directory
    pub fn load() -> Result<Self> {
        let paths = Paths::get()?;
        Self::load_from(&paths.settings_path())
    }

    /// Load configuration with `settings_path` as the file layer. A missing
    /// file is not an error.
    pub fn load_from(settings_path: &Path) -> Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to build default settings")?;

        let config: ServerConfig = Config::builder()
            .add_source(defaults)
            .add_source(File::from(settings_path).format(FileFormat::Json).required(false))
            .add_source(Environment::with_prefix("PARTIFY").try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no server can start with
    pub fn validate(&self) -> Result<()> {
        if self.mpd_server_hostname.trim().is_empty() {
            bail!("mpd_server_hostname must not be empty");
        }
        if self.server_host.trim().is_empty() {
            bail!("server_host must not be empty");
        }
        Ok(())
    }

    /// Save configuration to the settings file
    pub fn save(&self) -> Result<()> {
        let paths = Paths::get()?;
        self.save_to(&paths.settings_path())
    }

    pub fn save_to(&self, settings_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(settings_path, content).context("Failed to write settings file")?;
        Ok(())
    }

    /// Get the global config instance
    pub fn global() -> Arc<RwLock<ServerConfig>> {
        SERVER_CONFIG
            .get_or_init(|| {
                let config = ServerConfig::load().unwrap_or_else(|e| {
                    tracing::warn!("Using default settings: {:#}", e);
                    ServerConfig::default()
                });
                Arc::new(RwLock::new(config))
            })
            .clone()
    }
}
