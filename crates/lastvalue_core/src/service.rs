//! Service facade owning the store and its lifecycle.

use crate::api::LastValues;
use crate::config::Config;
use crate::error::CoreResult;
use crate::flatten::PathFlattener;
use crate::ingest::Ingestor;
use crate::query::QueryEngine;
use lastvalue_storage::{open_store, ShutdownToken, Store, TaskGroup};
use std::sync::Arc;

/// The main lastvalue handle.
///
/// `LastValueService` opens the configured store once and shares it
/// between ingestion and queries for the lifetime of the process.
///
/// # Lifecycle
///
/// Background store tasks observe a [`ShutdownToken`]. Cancelling it from
/// anywhere (a signal handler, for example) stops them; [`shutdown`]
/// cancels and then waits until every engine handle is released.
///
/// ```rust,no_run
/// use lastvalue_core::{Config, LastValueService};
///
/// let service = LastValueService::open(&Config::default())?;
/// service.ingestor().handle("event/d1/s2", b"42")?;
/// let result = service.query().get("d1", "s2", "")?;
/// assert_eq!(result.value, serde_json::json!(42));
/// service.shutdown();
/// # Ok::<(), lastvalue_core::CoreError>(())
/// ```
///
/// [`shutdown`]: LastValueService::shutdown
pub struct LastValueService {
    store: Arc<dyn Store>,
    query: QueryEngine,
    ingestor: Ingestor,
    tasks: TaskGroup,
}

impl LastValueService {
    /// Opens the store described by `config` with a fresh shutdown token.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid durations or an
    /// unavailable backend, and a store error if the engine fails to open.
    pub fn open(config: &Config) -> CoreResult<Self> {
        Self::open_with_token(config, ShutdownToken::new())
    }

    /// Opens the store, binding its background tasks to `token`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_token(config: &Config, token: ShutdownToken) -> CoreResult<Self> {
        let tasks = TaskGroup::new(token);
        let store = open_store(&config.storage(), &tasks)?;
        Ok(Self::assemble(store, tasks, config.debug))
    }

    /// Wraps an already opened store.
    ///
    /// Useful for tests with an in-memory store.
    pub fn with_store(store: Arc<dyn Store>, debug: bool) -> Self {
        Self::assemble(store, TaskGroup::new(ShutdownToken::new()), debug)
    }

    fn assemble(store: Arc<dyn Store>, tasks: TaskGroup, debug: bool) -> Self {
        let flattener = PathFlattener::new().with_debug(debug);
        Self {
            query: QueryEngine::with_flattener(Arc::clone(&store), flattener),
            ingestor: Ingestor::new(Arc::clone(&store)).with_debug(debug),
            store,
            tasks,
        }
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Returns the query engine.
    #[must_use]
    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    /// Returns the ingestor.
    #[must_use]
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Returns a batch resolver over the query engine.
    #[must_use]
    pub fn last_values(&self) -> LastValues<'_, QueryEngine> {
        LastValues::new(&self.query)
    }

    /// Returns the token background tasks observe.
    #[must_use]
    pub fn token(&self) -> &ShutdownToken {
        self.tasks.token()
    }

    /// Cancels the token and waits until background tasks have finished.
    ///
    /// Idempotent. Calls made after shutdown fail with a store error.
    pub fn shutdown(&self) {
        self.tasks.token().cancel();
        self.tasks.wait();
        tracing::info!(backend = %self.store.kind(), "lastvalue service stopped");
    }
}

impl Drop for LastValueService {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.shutdown();
        }
    }
}
