//! Shutdown signalling for background store tasks.
//!
//! A [`ShutdownToken`] is shared by everything that must stop when the
//! process shuts down. Stores spawn their maintenance threads through a
//! [`TaskGroup`]; the owner cancels the token and then calls
//! [`TaskGroup::wait`] to know every engine handle has been released.
//!
//! ```rust
//! use lastvalue_storage::{ShutdownToken, TaskGroup};
//! use std::time::Duration;
//!
//! let token = ShutdownToken::new();
//! let group = TaskGroup::new(token.clone());
//! group.spawn("ticker", |token| {
//!     while !token.wait_timeout(Duration::from_millis(10)) {}
//! }).unwrap();
//!
//! token.cancel();
//! group.wait();
//! ```

use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Signal {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

/// A cloneable, process-wide cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    signal: Arc<Signal>,
}

impl ShutdownToken {
    /// Creates a token that is not yet cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self.signal.cancelled.lock();
        *cancelled = true;
        self.signal.condvar.notify_all();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.signal.cancelled.lock()
    }

    /// Blocks until the token is cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.signal.cancelled.lock();
        while !*cancelled {
            self.signal.condvar.wait(&mut cancelled);
        }
    }

    /// Blocks until the token is cancelled or `timeout` elapses.
    ///
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.signal.cancelled.lock();
        while !*cancelled {
            if self
                .signal
                .condvar
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                break;
            }
        }
        *cancelled
    }
}

/// Named background threads bound to one [`ShutdownToken`].
#[derive(Debug)]
pub struct TaskGroup {
    token: ShutdownToken,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl TaskGroup {
    /// Creates an empty group driven by `token`.
    #[must_use]
    pub fn new(token: ShutdownToken) -> Self {
        Self {
            token,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Returns the token tasks in this group observe.
    #[must_use]
    pub fn token(&self) -> &ShutdownToken {
        &self.token
    }

    /// Spawns a named thread running `task` with a clone of the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn spawn<F>(&self, name: &str, task: F) -> io::Result<()>
    where
        F: FnOnce(ShutdownToken) + Send + 'static,
    {
        let token = self.token.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || task(token))?;
        self.handles.lock().push((name.to_string(), handle));
        Ok(())
    }

    /// Returns the number of tasks not yet joined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Returns true if no tasks are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Joins every spawned task.
    ///
    /// Call after cancelling the token. A task that panicked is logged and
    /// does not stop the remaining joins.
    pub fn wait(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for (name, handle) in handles {
            if handle.join().is_err() {
                tracing::error!(task = %name, "background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn token_starts_live() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn cancel_is_shared_by_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.wait_timeout(Duration::from_secs(5)));
        clone.wait();
    }

    #[test]
    fn cancel_wakes_waiting_thread() {
        let token = ShutdownToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(30)));

        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        token.cancel();
        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn group_waits_for_all_tasks() {
        let token = ShutdownToken::new();
        let group = TaskGroup::new(token.clone());
        let finished = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let finished = Arc::clone(&finished);
            group
                .spawn(&format!("task-{i}"), move |token| {
                    token.wait();
                    finished.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(group.len(), 3);

        token.cancel();
        group.wait();
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert!(group.is_empty());
    }

    #[test]
    fn panicking_task_does_not_block_wait() {
        let token = ShutdownToken::new();
        let group = TaskGroup::new(token.clone());
        group.spawn("boom", |_| panic!("boom")).unwrap();
        group.spawn("quiet", |token| token.wait()).unwrap();

        token.cancel();
        group.wait();
        assert!(group.is_empty());
    }
}
