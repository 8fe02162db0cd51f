//! Single-file B+tree store backed by redb.

use crate::error::{StoreError, StoreResult};
use crate::lifecycle::TaskGroup;
use crate::record::{Lookup, Record};
use crate::store::{BackendKind, Store};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the single table holding every record.
pub const TABLE_NAME: &str = "last_value";

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new(TABLE_NAME);

/// A page-file store.
///
/// All records live in one redb table inside one file. Memory use stays
/// small, which makes this the preferred store on constrained hardware.
/// Records never expire; a key keeps its value until it is overwritten.
///
/// # Thread Safety
///
/// redb serializes write transactions and lets readers run alongside
/// them, so `set` and `get` can be called from any number of threads.
///
/// # Example
///
/// ```no_run
/// use lastvalue_storage::{PageStore, ShutdownToken, Store, TaskGroup};
///
/// let group = TaskGroup::new(ShutdownToken::new());
/// let store = PageStore::open("data/last_value.db".as_ref(), &group).unwrap();
/// store.set("d1.s1", b"42").unwrap();
/// ```
#[derive(Debug)]
pub struct PageStore {
    path: PathBuf,
    db: Arc<RwLock<Option<Database>>>,
}

impl PageStore {
    /// Opens or creates the page file at `path`.
    ///
    /// Parent directories are created if needed. The database handle is
    /// released when the token of `group` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the table cannot be
    /// created, or the closer thread cannot be spawned.
    pub fn open(path: &Path, group: &TaskGroup) -> StoreResult<Self> {
        tracing::info!(path = %path.display(), "opening page store");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path).map_err(redb::Error::from)?;
        ensure_table(&db)?;

        let store = Self {
            path: path.to_path_buf(),
            db: Arc::new(RwLock::new(Some(db))),
        };

        let handle = Arc::clone(&store.db);
        let location = store.path.clone();
        group.spawn("lastvalue-page-closer", move |token| {
            token.wait();
            close_handle(&handle, &location);
        })?;

        Ok(store)
    }

    /// Returns the path of the page file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the database handle now.
    ///
    /// Later calls fail with [`StoreError::Closed`].
    pub fn close(&self) {
        close_handle(&self.db, &self.path);
    }
}

fn ensure_table(db: &Database) -> StoreResult<()> {
    let txn = db.begin_write().map_err(redb::Error::from)?;
    txn.open_table(RECORDS).map_err(redb::Error::from)?;
    txn.commit().map_err(redb::Error::from)?;
    Ok(())
}

fn close_handle(db: &RwLock<Option<Database>>, path: &Path) {
    if db.write().take().is_some() {
        tracing::info!(path = %path.display(), "page store closed");
    }
}

impl Store for PageStore {
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let encoded = Record::now(value).encode()?;

        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;

        let txn = db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(redb::Error::from)?;
            table
                .insert(key, encoded.as_slice())
                .map_err(redb::Error::from)?;
        }
        txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Lookup> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;

        let txn = db.begin_read().map_err(redb::Error::from)?;
        let table = txn.open_table(RECORDS).map_err(redb::Error::from)?;
        let Some(stored) = table.get(key).map_err(redb::Error::from)? else {
            return Ok(Lookup::NotFound);
        };

        match Record::decode(key, stored.value()) {
            Ok(record) => Ok(Lookup::Found(record)),
            Err(e) => {
                tracing::error!(key, error = %e, "unable to decode record from page store");
                Err(e)
            }
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Page
    }
}
