use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{SettingValue, SettingsStore};

/// Settings store persisted as a flat JSON object, written through on every set
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
    /// System accent preference; not persisted
    accent: Option<String>,
}

impl JsonFileSettings {
    /// `~/.config/window-borders/settings.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Open `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .context(format!("Failed to parse settings file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file found, using defaults");
                BTreeMap::new()
            }
            Err(e) => {
                return Err(e).context(format!("Failed to read settings file {}", path.display()));
            }
        };
        debug!(path = %path.display(), keys = values.len(), "Loaded settings");
        Ok(Self { path, values, accent: None })
    }

    pub fn with_accent(mut self, accent: Option<String>) -> Self {
        self.accent = accent;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&self.values)
            .context("Failed to serialize settings to JSON")?;
        fs::write(&self.path, contents)
            .context(format!("Failed to write settings file to {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn stored(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: SettingValue) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    fn accent_color(&self) -> Option<String> {
        self.accent.clone()
    }
}
