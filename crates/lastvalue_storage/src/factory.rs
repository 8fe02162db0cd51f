//! Backend selection and construction.

use crate::config::{StorageConfig, StorageSelection};
use crate::error::{ConfigError, ConfigResult, OpenError};
use crate::lifecycle::TaskGroup;
use crate::store::{BackendKind, Store};
use std::sync::Arc;

/// Resolves a selection to the backend that will be opened.
///
/// `Auto` picks the page store on 32-bit ARM, where RocksDB is a poor
/// fit, and whenever the compaction backend is compiled out.
///
/// # Errors
///
/// Returns [`ConfigError::BackendUnavailable`] if the resolved backend is
/// not compiled into this build.
pub fn resolve_backend(selection: StorageSelection) -> ConfigResult<BackendKind> {
    let kind = match selection {
        StorageSelection::Bolt => BackendKind::Page,
        StorageSelection::Badger => BackendKind::Compaction,
        StorageSelection::Auto => {
            if cfg!(target_arch = "arm") || !cfg!(feature = "compaction") {
                BackendKind::Page
            } else {
                BackendKind::Compaction
            }
        }
    };

    let available = match kind {
        BackendKind::Page => cfg!(feature = "page"),
        BackendKind::Compaction => cfg!(feature = "compaction"),
        BackendKind::Memory => true,
    };
    if !available {
        return Err(ConfigError::BackendUnavailable(kind.name()));
    }
    Ok(kind)
}

/// Opens the store described by `config`.
///
/// Duration strings are validated before any file is touched. Background
/// threads of the store are registered in `group`; cancel its token and
/// call [`TaskGroup::wait`] to shut the store down.
///
/// # Errors
///
/// Returns [`OpenError::Config`] for invalid configuration and
/// [`OpenError::Store`] if the engine cannot be opened.
///
/// # Example
///
/// ```no_run
/// use lastvalue_storage::{open_store, ShutdownToken, StorageConfig, TaskGroup};
///
/// let token = ShutdownToken::new();
/// let group = TaskGroup::new(token.clone());
/// let store = open_store(&StorageConfig::default(), &group).unwrap();
/// store.set("d1.s1", b"42").unwrap();
///
/// token.cancel();
/// group.wait();
/// ```
pub fn open_store(config: &StorageConfig, group: &TaskGroup) -> Result<Arc<dyn Store>, OpenError> {
    let kind = resolve_backend(config.selection)?;
    tracing::info!(selection = %config.selection, backend = %kind, "selected storage backend");

    match kind {
        BackendKind::Compaction => open_compaction(config, group),
        BackendKind::Page => open_page(config, group),
        BackendKind::Memory => Ok(Arc::new(crate::InMemoryStore::new())),
    }
}

#[cfg(feature = "compaction")]
fn open_compaction(config: &StorageConfig, group: &TaskGroup) -> Result<Arc<dyn Store>, OpenError> {
    let options = crate::CompactionOptions {
        ttl: config.parsed_ttl()?,
        interval: config.parsed_compaction_interval()?,
    };
    let store = crate::CompactionStore::open(&config.compaction_location, options, group)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "compaction"))]
fn open_compaction(_config: &StorageConfig, _group: &TaskGroup) -> Result<Arc<dyn Store>, OpenError> {
    Err(ConfigError::BackendUnavailable(BackendKind::Compaction.name()).into())
}

#[cfg(feature = "page")]
fn open_page(config: &StorageConfig, group: &TaskGroup) -> Result<Arc<dyn Store>, OpenError> {
    if !config.ttl.trim().is_empty() {
        tracing::warn!(ttl = %config.ttl, "page store does not expire records, ignoring ttl");
    }
    let store = crate::PageStore::open(&config.page_location, group)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "page"))]
fn open_page(_config: &StorageConfig, _group: &TaskGroup) -> Result<Arc<dyn Store>, OpenError> {
    Err(ConfigError::BackendUnavailable(BackendKind::Page.name()).into())
}
