//! Application settings
//!
//! The only user-editable setting is the backend API address. Settings are
//! kept in memory behind a lock and persisted as JSON in the user config
//! directory, so an edited address survives a restart.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Backend address used until the user configures another one
pub const DEFAULT_API_URL: &str = "https://anilibria.top/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub api_url: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            updated_at: None,
        }
    }
}

/// In-memory settings with JSON persistence
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Open the store at `path`, falling back to defaults when the file
    /// does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing settings at {}", path.display()))?
        } else {
            debug!(path = %path.display(), "no settings file, using defaults");
            AppSettings::default()
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    /// Default location: `<config dir>/hikari/settings.json`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("unable to resolve config directory")?;
        Ok(base.join("hikari").join("settings.json"))
    }

    pub fn get(&self) -> AppSettings {
        self.current.read().unwrap().clone()
    }

    pub fn api_url(&self) -> String {
        self.current.read().unwrap().api_url.clone()
    }

    /// Replace the active address for this process only, without persisting
    pub fn override_api_url(&self, api_url: impl Into<String>) {
        self.current.write().unwrap().api_url = api_url.into();
    }

    /// Persist new settings and make them current
    pub fn save(&self, mut settings: AppSettings) -> Result<()> {
        settings.updated_at = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing settings to {}", self.path.display()))?;

        info!(api_url = %settings.api_url, "settings saved");
        *self.current.write().unwrap() = settings;
        Ok(())
    }
}
