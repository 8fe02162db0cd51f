//! Stress tests for lastvalue stores.
//!
//! Concurrent writers and readers hammer a store and check that every
//! record read back is a whole `(value, time)` pair written by one `set`.

use chrono::{DateTime, Utc};
use lastvalue_storage::{Lookup, Store};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Key every writer competes for.
pub const SHARED_KEY: &str = "stress.shared";

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Reads whose value and time did not belong together.
    pub violations: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if nothing failed and no pairing was violated.
    pub fn is_clean(&self) -> bool {
        self.failed_ops == 0 && self.violations == 0
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Writer threads.
    pub writers: usize,
    /// Reader threads.
    pub readers: usize,
    /// Writes per writer.
    pub writes_per_writer: usize,
    /// Reads per reader.
    pub reads_per_reader: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            writers: 4,
            readers: 4,
            writes_per_writer: 200,
            reads_per_reader: 400,
        }
    }
}

#[derive(Default)]
struct Counters {
    successful: AtomicUsize,
    failed: AtomicUsize,
    violations: AtomicUsize,
}

impl Counters {
    fn ok(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn violation(&self) {
        self.violations.fetch_add(1, Ordering::Relaxed);
    }
}

fn writer_key(writer: usize) -> String {
    format!("stress.w{writer}")
}

/// Runs concurrent writers and readers against `store`.
///
/// Each payload embeds the instant taken just before its `set`. A read is
/// a violation if the stored time precedes that instant or if the payload
/// is not one a writer produced. After the run, each writer's own key
/// must hold its final write.
pub fn stress_concurrent_pairs(store: Arc<dyn Store>, config: &StressConfig) -> StressTestResult {
    let counters = Arc::new(Counters::default());
    let start = Instant::now();

    let mut handles = Vec::with_capacity(config.writers + config.readers);
    for writer in 0..config.writers {
        let store = Arc::clone(&store);
        let counters = Arc::clone(&counters);
        let writes = config.writes_per_writer;
        handles.push(thread::spawn(move || {
            let own = writer_key(writer);
            for seq in 0..writes {
                let payload = json!({
                    "writer": writer,
                    "seq": seq,
                    "before": Utc::now().to_rfc3339(),
                });
                let bytes = payload.to_string().into_bytes();
                for key in [own.as_str(), SHARED_KEY] {
                    match store.set(key, &bytes) {
                        Ok(()) => counters.ok(),
                        Err(_) => counters.failed(),
                    }
                }
            }
        }));
    }

    for reader in 0..config.readers {
        let store = Arc::clone(&store);
        let counters = Arc::clone(&counters);
        let reads = config.reads_per_reader;
        let writers = config.writers.max(1);
        handles.push(thread::spawn(move || {
            for i in 0..reads {
                let key = if i % 2 == 0 {
                    SHARED_KEY.to_string()
                } else {
                    writer_key((reader + i) % writers)
                };
                match store.get(&key) {
                    Ok(Lookup::Found(record)) => {
                        counters.ok();
                        if !pair_is_consistent(&record.value, record.time) {
                            counters.violation();
                        }
                    }
                    Ok(Lookup::NotFound) => counters.ok(),
                    Err(_) => counters.failed(),
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for writer in 0..config.writers {
        let expected_seq = config.writes_per_writer.checked_sub(1);
        let stored_seq = match store.get(&writer_key(writer)) {
            Ok(Lookup::Found(record)) => serde_json::from_slice::<Value>(&record.value)
                .ok()
                .and_then(|v| v["seq"].as_u64())
                .map(|seq| seq as usize),
            Ok(Lookup::NotFound) => None,
            Err(_) => {
                counters.failed();
                continue;
            }
        };
        if stored_seq != expected_seq {
            counters.violation();
        }
    }

    let successful = counters.successful.load(Ordering::Relaxed);
    let failed = counters.failed.load(Ordering::Relaxed);
    StressTestResult {
        total_ops: successful + failed,
        successful_ops: successful,
        failed_ops: failed,
        violations: counters.violations.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

fn pair_is_consistent(value: &[u8], time: DateTime<Utc>) -> bool {
    let Ok(payload) = serde_json::from_slice::<Value>(value) else {
        return false;
    };
    let before = payload["before"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
    match before {
        Some(before) => time >= before.with_timezone(&Utc),
        None => false,
    }
}
