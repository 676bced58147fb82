//! Persisted user preferences.
//!
//! The store is a flat JSON object. Path resolution order:
//! 1. an explicit path passed to [`SettingsStore::open`]
//! 2. the `DYNAWALL_SETTINGS` environment variable
//! 3. `<config dir>/dynawall/settings.json`, via `dirs`

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    foundation::error::{FileError, StorageError, WallpaperError, WallpaperResult},
    pipeline::create::ensure_parent_dir,
};

/// Environment variable overriding the settings file location.
pub const ENV_SETTINGS_PATH: &str = "DYNAWALL_SETTINGS";

/// Key under which the last used observer location is remembered.
pub const LOCATION_KEY: &str = "solar.location";

const APP_DIR: &str = "dynawall";
const FILE_NAME: &str = "settings.json";

/// Key/value settings backed by a JSON file.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl SettingsStore {
    /// Platform default settings path, honouring [`ENV_SETTINGS_PATH`].
    pub fn default_path() -> Option<PathBuf> {
        if let Some(p) = std::env::var_os(ENV_SETTINGS_PATH).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(p));
        }
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Open the store at [`SettingsStore::default_path`].
    pub fn open_default() -> WallpaperResult<Self> {
        let path = Self::default_path().ok_or_else(|| {
            WallpaperError::validation("no configuration directory available for settings")
        })?;
        Self::open(path)
    }

    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> WallpaperResult<Self> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => {
                let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                    WallpaperError::serde(format!("parse settings '{}': {e}", path.display()))
                })?;
                match value {
                    Value::Object(map) => map,
                    other => {
                        return Err(WallpaperError::serde(format!(
                            "settings '{}' must hold a JSON object, found {}",
                            path.display(),
                            json_kind(&other)
                        )));
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file yet");
                Map::new()
            }
            Err(e) => return Err(FileError::content_not_obtained(&path, e).into()),
        };
        Ok(Self { path, values })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Typed value under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| StorageError::KeyNotFound(key.to_string()))?;
        T::deserialize(value).map_err(|e| StorageError::InvalidType {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Store `value` under `key`, replacing any previous value. Call [`SettingsStore::save`]
    /// to persist.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> WallpaperResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| WallpaperError::serde(format!("settings value '{key}': {e}")))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Drop `key`; returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Write the store back to its file, creating parent directories.
    pub fn save(&self) -> WallpaperResult<()> {
        ensure_parent_dir(&self.path)?;
        let json = serde_json::to_vec_pretty(&self.values)
            .map_err(|e| WallpaperError::serde(format!("serialize settings: {e}")))?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write settings '{}'", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), keys = self.values.len(), "settings saved");
        Ok(())
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/store.rs"]
mod tests;
