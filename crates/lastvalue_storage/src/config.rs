//! Store configuration.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which engine the factory should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageSelection {
    /// The single-file page store.
    Bolt,
    /// The compaction (LSM) store.
    Badger,
    /// Page store on 32-bit ARM, compaction store elsewhere.
    #[default]
    Auto,
}

impl StorageSelection {
    /// Configuration name of the selection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bolt => "bolt",
            Self::Badger => "badger",
            Self::Auto => "auto",
        }
    }
}

impl From<String> for StorageSelection {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bolt" => Self::Bolt,
            "badger" => Self::Badger,
            "auto" => Self::Auto,
            other => {
                tracing::warn!(selection = %other, "unknown storage selection, using badger");
                Self::Badger
            }
        }
    }
}

impl From<StorageSelection> for String {
    fn from(value: StorageSelection) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for StorageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration consumed by [`crate::open_store`].
///
/// Durations are kept as strings until a store is opened so that a bad
/// value is reported as a [`ConfigError`] at construction time. They use
/// the `humantime` grammar (`"10m"`, `"1h 30m"`); fractional terms such
/// as `"1.5h"` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection.
    pub selection: StorageSelection,

    /// File used by the page store.
    pub page_location: PathBuf,

    /// Directory used by the compaction store.
    pub compaction_location: PathBuf,

    /// Record time-to-live for the compaction store ("" = no expiry).
    pub ttl: String,

    /// How often the compaction store compacts its files.
    pub compaction_interval: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            selection: StorageSelection::Auto,
            page_location: PathBuf::from("./data/last_value.db"),
            compaction_location: PathBuf::from("./data/badger"),
            ttl: String::new(),
            compaction_interval: "10m".to_string(),
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend selection.
    #[must_use]
    pub fn with_selection(mut self, selection: StorageSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the page store file.
    #[must_use]
    pub fn with_page_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.page_location = path.into();
        self
    }

    /// Sets the compaction store directory.
    #[must_use]
    pub fn with_compaction_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.compaction_location = path.into();
        self
    }

    /// Sets the record TTL string.
    #[must_use]
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }

    /// Sets the compaction interval string.
    #[must_use]
    pub fn with_compaction_interval(mut self, interval: impl Into<String>) -> Self {
        self.compaction_interval = interval.into();
        self
    }

    /// Parses the TTL. `None` means records never expire.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid duration.
    pub fn parsed_ttl(&self) -> ConfigResult<Option<Duration>> {
        let ttl = self.ttl.trim();
        if ttl.is_empty() {
            return Ok(None);
        }
        let ttl = parse_duration("ttl", ttl)?;
        Ok((!ttl.is_zero()).then_some(ttl))
    }

    /// Parses the compaction interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty, invalid or zero.
    pub fn parsed_compaction_interval(&self) -> ConfigResult<Duration> {
        let interval = parse_duration("compaction_interval", self.compaction_interval.trim())?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(interval)
    }
}

/// Parses a human duration such as `"90s"`, `"1h 30m"` or `"1.5h"`.
fn parse_duration(field: &'static str, value: &str) -> ConfigResult<Duration> {
    let normalized = if value.contains('.') {
        fractional_to_nanos(value)
    } else {
        None
    };
    humantime::parse_duration(normalized.as_deref().unwrap_or(value))
        .map_err(|e| ConfigError::invalid_duration(field, value, e))
}

/// Rewrites a duration with fractional components (`"1.5h"`, `"1h0.5m"`)
/// as a whole number of nanoseconds. `None` if `value` is not a sequence
/// of `<number><unit>` terms.
fn fractional_to_nanos(value: &str) -> Option<String> {
    let mut total: u128 = 0;
    let mut rest = value.trim();
    if rest.is_empty() {
        return None;
    }
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail.trim_start();

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        total = total.checked_add(whole.checked_mul(scale)?)?;

        // Digits below nanosecond resolution are dropped.
        let mut place = scale;
        for digit in fraction.chars() {
            let digit = u128::from(digit.to_digit(10)?);
            place /= 10;
            total = total.checked_add(digit * place)?;
        }
    }
    Some(format!("{total}ns"))
}
