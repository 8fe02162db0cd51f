//! Log-structured merge store backed by RocksDB.

use crate::error::{StoreError, StoreResult};
use crate::lifecycle::TaskGroup;
use crate::record::{Lookup, Record};
use crate::store::{BackendKind, Store};
use chrono::Utc;
use parking_lot::RwLock;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

type Db = DBWithThreadMode<MultiThreaded>;

/// Options for [`CompactionStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionOptions {
    /// Record time-to-live. `None` disables expiry.
    pub ttl: Option<Duration>,
    /// Interval between background compactions.
    pub interval: Duration,
}

impl Default for CompactionOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            interval: Duration::from_secs(600),
        }
    }
}

/// An LSM store with optional record expiry.
///
/// Every record is written as one RocksDB value, so value and time are
/// replaced atomically by the engine's per-key put. The database is
/// always opened in TTL mode, with a zero TTL when records never expire,
/// so a store can be reopened with a different TTL. RocksDB only drops
/// stale rows while compacting, so `get` also hides any record older than
/// the TTL.
///
/// A background thread flushes and compacts the database every
/// [`CompactionOptions::interval`] until the group's token is cancelled,
/// then releases the engine handle.
#[derive(Debug)]
pub struct CompactionStore {
    path: PathBuf,
    ttl: Option<Duration>,
    db: Arc<RwLock<Option<Db>>>,
}

impl CompactionStore {
    /// Opens or creates the store directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, RocksDB fails
    /// to open, or the maintenance thread cannot be spawned.
    pub fn open(path: &Path, options: CompactionOptions, group: &TaskGroup) -> StoreResult<Self> {
        tracing::info!(
            path = %path.display(),
            ttl = ?options.ttl,
            interval = ?options.interval,
            "opening compaction store"
        );
        std::fs::create_dir_all(path)?;

        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        let db = Db::open_with_ttl(&db_options, path, engine_ttl(options.ttl))?;

        let store = Self {
            path: path.to_path_buf(),
            ttl: options.ttl,
            db: Arc::new(RwLock::new(Some(db))),
        };

        let handle = Arc::clone(&store.db);
        let location = store.path.clone();
        let interval = options.interval;
        group.spawn("lastvalue-compaction", move |token| {
            while !token.wait_timeout(interval) {
                if let Some(db) = handle.read().as_ref() {
                    compact(db, &location);
                }
            }
            close_handle(&handle, &location);
        })?;

        Ok(store)
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured record TTL.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Runs one flush and full-range compaction now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] after shutdown.
    pub fn compact_now(&self) -> StoreResult<()> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        compact(db, &self.path);
        Ok(())
    }

    /// Releases the engine handle now.
    ///
    /// Later calls fail with [`StoreError::Closed`].
    pub fn close(&self) {
        close_handle(&self.db, &self.path);
    }

    fn expired(&self, record: &Record) -> bool {
        let Some(ttl) = self.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) else {
            return false;
        };
        Utc::now().signed_duration_since(record.time) >= ttl
    }
}

/// TTL handed to RocksDB.
///
/// The database is always opened in TTL mode so the on-disk value format
/// does not depend on whether a TTL is configured; zero means no expiry.
/// RocksDB counts whole seconds, so a fractional TTL is rounded up.
fn engine_ttl(ttl: Option<Duration>) -> Duration {
    match ttl {
        None => Duration::ZERO,
        Some(ttl) if ttl.subsec_nanos() > 0 => Duration::from_secs(ttl.as_secs() + 1),
        Some(ttl) => ttl,
    }
}

fn compact(db: &Db, path: &Path) {
    if let Err(e) = db.flush() {
        tracing::warn!(path = %path.display(), error = %e, "compaction flush failed");
        return;
    }
    db.compact_range::<&[u8], &[u8]>(None, None);
    tracing::debug!(path = %path.display(), "compaction finished");
}

fn close_handle(db: &RwLock<Option<Db>>, path: &Path) {
    let Some(db) = db.write().take() else {
        return;
    };
    if let Err(e) = db.flush() {
        tracing::warn!(path = %path.display(), error = %e, "unable to flush compaction store on close");
    }
    drop(db);
    tracing::info!(path = %path.display(), "compaction store closed");
}

impl Store for CompactionStore {
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let encoded = Record::now(value).encode()?;

        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        db.put(key.as_bytes(), encoded)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Lookup> {
        let stored = {
            let guard = self.db.read();
            let db = guard.as_ref().ok_or(StoreError::Closed)?;
            db.get(key.as_bytes()).map_err(|e| {
                tracing::error!(key, error = %e, "unable to read value from compaction store");
                e
            })?
        };
        let Some(stored) = stored else {
            return Ok(Lookup::NotFound);
        };

        let record = Record::decode(key, &stored).map_err(|e| {
            tracing::error!(key, error = %e, "unable to decode record from compaction store");
            e
        })?;
        if self.expired(&record) {
            return Ok(Lookup::NotFound);
        }
        Ok(Lookup::Found(record))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Compaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownToken;
    use std::thread;
    use tempfile::tempdir;

    fn open(path: &Path, options: CompactionOptions) -> (CompactionStore, ShutdownToken, TaskGroup) {
        let token = ShutdownToken::new();
        let group = TaskGroup::new(token.clone());
        let store = CompactionStore::open(path, options, &group).unwrap();
        (store, token, group)
    }

    #[test]
    fn compaction_missing_key() {
        let dir = tempdir().unwrap();
        let (store, _token, _group) = open(dir.path(), CompactionOptions::default());
        assert_eq!(store.get("unknown.s1").unwrap(), Lookup::NotFound);
        assert_eq!(store.kind(), BackendKind::Compaction);
    }

    #[test]
    fn compaction_set_get_overwrite() {
        let dir = tempdir().unwrap();
        let (store, _token, _group) = open(dir.path(), CompactionOptions::default());

        let before = Utc::now();
        store.set("d1.replace", b"13").unwrap();
        store.set("d1.replace", b"42").unwrap();

        let record = store.get("d1.replace").unwrap().record().cloned().unwrap();
        assert_eq!(record.value, b"42");
        assert!(record.time >= before);
    }

    #[test]
    fn compaction_empty_value() {
        let dir = tempdir().unwrap();
        let (store, _token, _group) = open(dir.path(), CompactionOptions::default());

        store.set("d1.s0", b"").unwrap();
        let record = store.get("d1.s0").unwrap().record().cloned().unwrap();
        assert!(record.value.is_empty());
    }

    #[test]
    fn compaction_ttl_expires_records() {
        let dir = tempdir().unwrap();
        let options = CompactionOptions {
            ttl: Some(Duration::from_secs(1)),
            interval: Duration::from_secs(60),
        };
        let (store, _token, _group) = open(dir.path(), options);
        assert_eq!(store.ttl(), Some(Duration::from_secs(1)));

        store.set("d1.s1", b"42").unwrap();
        assert!(matches!(store.get("d1.s1").unwrap(), Lookup::Found(_)));

        thread::sleep(Duration::from_millis(1500));
        assert_eq!(store.get("d1.s1").unwrap(), Lookup::NotFound);
    }

    #[test]
    fn compaction_runs_in_background() {
        let dir = tempdir().unwrap();
        let options = CompactionOptions {
            ttl: None,
            interval: Duration::from_millis(20),
        };
        let (store, token, group) = open(dir.path(), options);

        for i in 0..100 {
            store.set(&format!("d{i}.s"), b"x").unwrap();
        }
        thread::sleep(Duration::from_millis(100));
        assert_eq!(store.get("d7.s").unwrap().record().unwrap().value, b"x");

        token.cancel();
        group.wait();
    }

    #[test]
    fn compaction_compact_now() {
        let dir = tempdir().unwrap();
        let (store, _token, _group) = open(dir.path(), CompactionOptions::default());
        store.set("a.b", b"1").unwrap();
        store.compact_now().unwrap();
        assert_eq!(store.get("a.b").unwrap().record().unwrap().value, b"1");
    }

    #[test]
    fn compaction_shutdown_releases_handle() {
        let dir = tempdir().unwrap();
        {
            let (store, token, group) = open(dir.path(), CompactionOptions::default());
            store.set("d1.s2", b"42").unwrap();

            token.cancel();
            group.wait();
            assert!(matches!(store.get("d1.s2"), Err(StoreError::Closed)));
            assert!(matches!(store.compact_now(), Err(StoreError::Closed)));
        }

        // The directory lock is free again.
        let (store, _token, _group) = open(dir.path(), CompactionOptions::default());
        assert_eq!(store.get("d1.s2").unwrap().record().unwrap().value, b"42");
    }

    fn write_then_reopen(first: Option<Duration>, second: Option<Duration>) {
        let dir = tempdir().unwrap();
        let options = |ttl| CompactionOptions {
            ttl,
            ..CompactionOptions::default()
        };
        {
            let (store, token, group) = open(dir.path(), options(first));
            store.set("d1.s2", b"42").unwrap();
            token.cancel();
            group.wait();
        }

        let (store, _token, _group) = open(dir.path(), options(second));
        let record = store.get("d1.s2").unwrap().record().cloned().unwrap();
        assert_eq!(record.value, b"42");
    }

    #[test]
    fn compaction_reopen_dropping_ttl() {
        write_then_reopen(Some(Duration::from_secs(3600)), None);
    }

    #[test]
    fn compaction_reopen_adding_ttl() {
        write_then_reopen(None, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn engine_ttl_whole_seconds() {
        assert_eq!(engine_ttl(None), Duration::ZERO);
        assert_eq!(engine_ttl(Some(Duration::from_secs(30))), Duration::from_secs(30));
        assert_eq!(engine_ttl(Some(Duration::from_millis(500))), Duration::from_secs(1));
        assert_eq!(engine_ttl(Some(Duration::from_millis(1500))), Duration::from_secs(2));
    }
}
