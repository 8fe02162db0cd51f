//! Application configuration.
//!
//! Loaded from a JSON file whose keys match the field names, then
//! overridden by environment variables named after the upper-cased field
//! (`STORAGE_SELECTION`, `BOLT_LOCATION`, ...).

use lastvalue_storage::{ConfigError, ConfigResult, StorageConfig, StorageSelection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration of a lastvalue process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend selection: `"bolt"`, `"badger"` or `"auto"`.
    pub storage_selection: StorageSelection,
    /// Page store file.
    pub bolt_location: PathBuf,
    /// Compaction store directory.
    pub badger_location: PathBuf,
    /// Compaction store record TTL ("" = never expire).
    pub badger_ttl: String,
    /// Compaction store maintenance interval.
    pub badger_gc_interval: String,
    /// Verbose per-message logging.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        let storage = StorageConfig::default();
        Self {
            storage_selection: storage.selection,
            bolt_location: storage.page_location,
            badger_location: storage.compaction_location,
            badger_ttl: storage.ttl,
            badger_gc_interval: storage.compaction_interval,
            debug: false,
        }
    }
}

impl Config {
    /// Loads `path` and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Parses a JSON document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(ConfigError::from)
    }

    /// Applies overrides looked up by upper-cased field name.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("STORAGE_SELECTION") {
            self.storage_selection = StorageSelection::from(value);
        }
        if let Some(value) = lookup("BOLT_LOCATION") {
            self.bolt_location = PathBuf::from(value);
        }
        if let Some(value) = lookup("BADGER_LOCATION") {
            self.badger_location = PathBuf::from(value);
        }
        if let Some(value) = lookup("BADGER_TTL") {
            self.badger_ttl = value;
        }
        if let Some(value) = lookup("BADGER_GC_INTERVAL") {
            self.badger_gc_interval = value;
        }
        if let Some(value) = lookup("DEBUG") {
            self.debug = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Storage part of the configuration.
    #[must_use]
    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new()
            .with_selection(self.storage_selection)
            .with_page_location(&self.bolt_location)
            .with_compaction_location(&self.badger_location)
            .with_ttl(self.badger_ttl.clone())
            .with_compaction_interval(self.badger_gc_interval.clone())
    }
}
