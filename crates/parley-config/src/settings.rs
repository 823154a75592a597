// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime key/value settings for context memory.
//!
//! Config files supply the defaults; a [`SettingsStore`] holds whatever the
//! user changed at runtime. Reads and writes are synchronous.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use parley_core::ParleyError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::ContextMemoryConfig;

pub const KEY_ENABLED: &str = "context_memory.enabled";
pub const KEY_MAX_TOKENS: &str = "context_memory.max_tokens";
pub const KEY_DAYS: &str = "context_memory.days";

/// Longest accepted recent-meeting window, in days.
pub const MAX_CONTEXT_DAYS: u32 = 36_500;

/// Synchronous string key/value store.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ParleyError>;
}

/// Process-local settings, lost on exit.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object, rewritten on every `set`.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Open the settings file. A missing file starts empty; an unreadable one
    /// is logged and also starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "settings file is not valid JSON, ignoring");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings file");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), ParleyError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(ParleyError::storage)?;
        }
        let json = serde_json::to_string_pretty(values).map_err(ParleyError::storage)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(ParleyError::storage)?;
        std::fs::rename(&tmp, &self.path).map_err(ParleyError::storage)
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}

/// Effective context memory settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMemorySettings {
    pub enabled: bool,
    pub max_tokens: u32,
    pub days: u32,
}

impl ContextMemorySettings {
    /// Read settings, falling back to config defaults for missing or
    /// unparsable values.
    pub fn load(store: &dyn SettingsStore, defaults: &ContextMemoryConfig) -> Self {
        Self {
            enabled: read(store, KEY_ENABLED).unwrap_or(defaults.enabled),
            max_tokens: read(store, KEY_MAX_TOKENS)
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_tokens),
            days: read(store, KEY_DAYS)
                .filter(|v| *v > 0)
                .unwrap_or(defaults.days),
        }
    }
}

impl From<&ContextMemoryConfig> for ContextMemorySettings {
    fn from(config: &ContextMemoryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_tokens: config.max_tokens,
            days: config.days,
        }
    }
}

fn read<T: std::str::FromStr>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

/// A partial settings change. `None` fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMemorySettingsUpdate {
    pub enabled: Option<bool>,
    pub max_tokens: Option<u32>,
    pub days: Option<u32>,
}

impl ContextMemorySettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.max_tokens.is_none() && self.days.is_none()
    }

    /// Write the provided fields. Zero budgets and windows are rejected
    /// before anything is written.
    pub fn apply(&self, store: &dyn SettingsStore) -> Result<(), ParleyError> {
        if self.max_tokens == Some(0) {
            return Err(ParleyError::Config(
                "context_memory.max_tokens must be at least 1".into(),
            ));
        }
        if self.days == Some(0) {
            return Err(ParleyError::Config(
                "context_memory.days must be at least 1".into(),
            ));
        }
        if self.days.is_some_and(|days| days > MAX_CONTEXT_DAYS) {
            return Err(ParleyError::Config(format!(
                "context_memory.days must be at most {MAX_CONTEXT_DAYS}"
            )));
        }

        if let Some(enabled) = self.enabled {
            store.set(KEY_ENABLED, &enabled.to_string())?;
        }
        if let Some(max_tokens) = self.max_tokens {
            store.set(KEY_MAX_TOKENS, &max_tokens.to_string())?;
        }
        if let Some(days) = self.days {
            store.set(KEY_DAYS, &days.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_falls_back_to_defaults() {
        let store = InMemorySettings::new();
        let settings = ContextMemorySettings::load(&store, &ContextMemoryConfig::default());
        assert_eq!(
            settings,
            ContextMemorySettings {
                enabled: true,
                max_tokens: 1500,
                days: 30,
            }
        );
    }

    #[test]
    fn partial_update_only_touches_given_fields() {
        let store = InMemorySettings::new();
        ContextMemorySettingsUpdate {
            max_tokens: Some(800),
            ..Default::default()
        }
        .apply(&store)
        .unwrap();

        assert_eq!(store.get(KEY_MAX_TOKENS).as_deref(), Some("800"));
        assert!(store.get(KEY_ENABLED).is_none());
        let settings = ContextMemorySettings::load(&store, &ContextMemoryConfig::default());
        assert_eq!(settings.max_tokens, 800);
        assert_eq!(settings.days, 30);
    }

    #[test]
    fn garbage_value_uses_default() {
        let store = InMemorySettings::new();
        store.set(KEY_DAYS, "a fortnight").unwrap();
        store.set(KEY_ENABLED, "false").unwrap();
        let settings = ContextMemorySettings::load(&store, &ContextMemoryConfig::default());
        assert_eq!(settings.days, 30);
        assert!(!settings.enabled);
    }

    #[test]
    fn zero_budget_is_rejected_without_writes() {
        let store = InMemorySettings::new();
        let update = ContextMemorySettingsUpdate {
            enabled: Some(false),
            max_tokens: Some(0),
            days: None,
        };
        assert!(update.apply(&store).is_err());
        assert!(store.get(KEY_ENABLED).is_none());
    }

    #[test]
    fn oversized_window_is_rejected_without_writes() {
        let store = InMemorySettings::new();
        let update = ContextMemorySettingsUpdate {
            days: Some(200_000_000),
            ..Default::default()
        };
        let err = update.apply(&store).unwrap_err();
        assert!(err.to_string().contains("at most"));
        assert!(store.get(KEY_DAYS).is_none());

        ContextMemorySettingsUpdate {
            days: Some(MAX_CONTEXT_DAYS),
            ..Default::default()
        }
        .apply(&store)
        .unwrap();
        assert_eq!(store.get(KEY_DAYS), Some(MAX_CONTEXT_DAYS.to_string()));
    }

    #[test]
    fn file_settings_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = FileSettings::open(&path);
        store.set(KEY_DAYS, "7").unwrap();
        drop(store);

        let reopened = FileSettings::open(&path);
        assert_eq!(reopened.get(KEY_DAYS).as_deref(), Some("7"));
    }

    #[test]
    fn corrupt_settings_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSettings::open(&path);
        assert!(store.get(KEY_ENABLED).is_none());
    }
}
