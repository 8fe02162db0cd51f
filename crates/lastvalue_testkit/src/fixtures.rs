//! Test fixtures for lastvalue.
//!
//! Provides stores and services backed by temporary directories that are
//! shut down before the directory is removed.

use lastvalue_core::{Config, CoreResult, LastValueService};
use lastvalue_storage::{
    open_store, OpenError, ShutdownToken, StorageConfig, StorageSelection, Store, StoreError,
    TaskGroup,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A store opened inside a temporary directory.
///
/// Dropping it cancels the background tasks, waits for the engine to be
/// released and then deletes the directory.
pub struct TempStore {
    tasks: TaskGroup,
    store: Arc<dyn Store>,
    dir: TempDir,
}

impl TempStore {
    /// Opens a store for `selection` with default durations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the engine cannot be created.
    pub fn open(selection: StorageSelection) -> Result<Self, OpenError> {
        Self::open_with(selection, |config| config)
    }

    /// Opens a store after letting `configure` adjust the storage config.
    ///
    /// Locations are already pointed into the temporary directory when
    /// `configure` runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the engine cannot be created.
    pub fn open_with(
        selection: StorageSelection,
        configure: impl FnOnce(StorageConfig) -> StorageConfig,
    ) -> Result<Self, OpenError> {
        let dir = tempfile::tempdir().map_err(StoreError::from)?;
        let config = configure(storage_config(dir.path(), selection));
        let tasks = TaskGroup::new(ShutdownToken::new());
        let store = open_store(&config, &tasks)?;
        Ok(Self { tasks, store, dir })
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Returns the temporary directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the token the store's tasks observe.
    pub fn token(&self) -> &ShutdownToken {
        self.tasks.token()
    }

    /// Cancels and joins the store's tasks.
    pub fn shutdown(&self) {
        self.tasks.token().cancel();
        self.tasks.wait();
    }
}

impl Drop for TempStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens a temporary store, panicking on failure.
pub fn temp_store(selection: StorageSelection) -> TempStore {
    TempStore::open(selection).expect("Failed to open temporary store")
}

/// A [`LastValueService`] opened inside a temporary directory.
pub struct TempService {
    service: LastValueService,
    _dir: TempDir,
}

impl TempService {
    /// Opens a service for `selection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(selection: StorageSelection) -> CoreResult<Self> {
        let dir = tempfile::tempdir().map_err(StoreError::from)?;
        let config = Config {
            storage_selection: selection,
            bolt_location: dir.path().join("last_value.db"),
            badger_location: dir.path().join("badger"),
            debug: true,
            ..Config::default()
        };
        let service = LastValueService::open(&config)?;
        Ok(Self { service, _dir: dir })
    }
}

impl std::ops::Deref for TempService {
    type Target = LastValueService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

/// Opens a temporary service, panicking on failure.
pub fn temp_service(selection: StorageSelection) -> TempService {
    TempService::open(selection).expect("Failed to open temporary service")
}

/// Runs `f` against a temporary store of every selection.
pub fn with_each_store<F>(mut f: F)
where
    F: FnMut(StorageSelection, &dyn Store),
{
    for selection in [StorageSelection::Bolt, StorageSelection::Badger, StorageSelection::Auto] {
        let store = temp_store(selection);
        f(selection, store.store().as_ref());
    }
}

fn storage_config(dir: &Path, selection: StorageSelection) -> StorageConfig {
    StorageConfig::new()
        .with_selection(selection)
        .with_page_location(dir.join("last_value.db"))
        .with_compaction_location(dir.join("badger"))
}
