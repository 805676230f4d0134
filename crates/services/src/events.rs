//! Typed, synchronous event fan-out for progress observers.
//!
//! Listeners are snapshotted before each emit, so a listener added or removed
//! during an emit only takes effect on the next one. A panicking listener is
//! logged and skipped; the remaining listeners still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use progress_core::model::{Achievement, Module, ProgressCache, ProgressRecord};
use serde_json::{Map, Value};
use tracing::error;

/// Which synchronizer operation a failure event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Load,
    Save,
    Unlock,
    Stats,
    Resync,
}

impl SyncOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Unlock => "unlock",
            Self::Stats => "stats",
            Self::Resync => "resync",
        }
    }
}

/// Everything observers can hear about.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressEvent {
    /// Initial load finished; carries the merged cache.
    Loaded(ProgressCache),
    /// A progress write was confirmed by the remote store.
    Saved {
        module: Module,
        item_id: String,
        record: ProgressRecord,
    },
    /// An achievement was unlocked for the first time.
    Achievement { id: String, achievement: Achievement },
    /// A stats write was confirmed by the remote store; carries the full stats.
    StatsUpdated(Map<String, Value>),
    /// Queued updates were flushed to the remote store.
    Resynced { flushed: usize },
    SyncFailed {
        operation: SyncOperation,
        message: String,
    },
    ConnectivityChanged { online: bool },
}

type ListenerFn<T> = dyn Fn(&T) + Send + Sync;
type ListenerList<T> = Mutex<Vec<(u64, Arc<ListenerFn<T>>)>>;

/// Typed event emitter. All methods take `&self`.
pub struct EventEmitter<T> {
    listeners: Arc<ListenerList<T>>,
    next_id: AtomicU64,
}

impl<T: 'static> EventEmitter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `callback` and returns the handle that removes it.
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(callback)));
        let listeners: Weak<ListenerList<T>> = Arc::downgrade(&self.listeners);
        ListenerHandle {
            id,
            remove: Box::new(move |id| {
                if let Some(listeners) = listeners.upgrade() {
                    lock(&listeners).retain(|(lid, _)| *lid != id);
                }
            }),
        }
    }

    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Arc<ListenerFn<T>>> = lock(&self.listeners)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in snapshot {
            if catch_unwind(AssertUnwindSafe(|| cb(event))).is_err() {
                error!("progress listener panicked; continuing with the rest");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its listener on [`ListenerHandle::unsubscribe`]. Dropping the
/// handle leaves the listener registered.
pub struct ListenerHandle {
    id: u64,
    remove: Box<dyn Fn(u64) + Send + Sync>,
}

impl ListenerHandle {
    /// Safe to call more than once.
    pub fn unsubscribe(&self) {
        (self.remove)(self.id);
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emits_to_every_listener_until_unsubscribed() {
        let emitter = EventEmitter::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&total);
        let handle = emitter.on(move |n| {
            seen.fetch_add(*n as usize, Ordering::SeqCst);
        });
        emitter.emit(&2);
        handle.unsubscribe();
        handle.unsubscribe();
        emitter.emit(&5);

        assert_eq!(total.load(Ordering::SeqCst), 2);
        assert!(emitter.is_empty());
    }

    #[test]
    fn panicking_listener_does_not_stop_the_others() {
        let emitter = EventEmitter::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _first = emitter.on(|_| panic!("listener failure"));
        let seen = Arc::clone(&calls);
        let _second = emitter.on(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&1);
        emitter.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn operation_names_match_log_vocabulary() {
        let names: Vec<_> = [
            SyncOperation::Load,
            SyncOperation::Save,
            SyncOperation::Unlock,
            SyncOperation::Stats,
            SyncOperation::Resync,
        ]
        .into_iter()
        .map(SyncOperation::as_str)
        .collect();
        assert_eq!(names, ["load", "save", "unlock", "stats", "resync"]);
    }

    #[test]
    fn handle_outliving_emitter_is_harmless() {
        let emitter = EventEmitter::<u32>::new();
        let handle = emitter.on(|_| {});
        drop(emitter);
        handle.unsubscribe();
    }
}
