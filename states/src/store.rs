//! Single authoritative state store with atomic read-modify-write updates.
//!
//! The store exists to rule out lost updates when several async callbacks
//! complete close together: a callback never holds a stale copy of the state,
//! it is handed a `&mut` to the one current value under the lock. Observers
//! can subscribe to a change signal through a `flume` channel.

use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, mutable state with atomic updates and change notification.
///
/// Cloning a `Store` clones the handle, not the state; all clones observe
/// and mutate the same value.
#[derive(Debug)]
pub struct Store<S> {
    inner: Arc<Mutex<S>>,
    watchers: Arc<Mutex<Vec<flume::Sender<()>>>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            watchers: Arc::clone(&self.watchers),
        }
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
            watchers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Atomically read-modify-write the state and notify watchers.
    ///
    /// The closure runs under the lock, so it always sees the latest state;
    /// two callbacks firing in the same tick serialize here instead of
    /// clobbering each other.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut state = lock_ignore_poison(&self.inner);
            f(&mut state)
        };
        self.notify();
        result
    }

    /// Read the current state without mutating it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = lock_ignore_poison(&self.inner);
        f(&state)
    }

    /// Subscribe to change notifications.
    ///
    /// One `()` is sent per committed update. Dropped receivers are pruned
    /// on the next notification.
    pub fn subscribe(&self) -> flume::Receiver<()> {
        let (tx, rx) = flume::unbounded();
        lock_ignore_poison(&self.watchers).push(tx);
        rx
    }

    fn notify(&self) {
        lock_ignore_poison(&self.watchers).retain(|tx| tx.send(()).is_ok());
    }
}

impl<S: Clone> Store<S> {
    /// Clone the current state out of the store.
    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }
}

// A poisoned lock only means another thread panicked mid-update; the state
// itself is still usable for a UI-facing store, so recover the guard.
fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
