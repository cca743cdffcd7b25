// src/watch/subscribers.rs

//! Subscriber bookkeeping for a single watcher.
//!
//! Callbacks live in a map guarded by a `parking_lot::Mutex`. Notification
//! clones the `Arc`s out under the lock and invokes them after releasing it,
//! so a callback may register or dispose registrations (including its own)
//! without deadlocking, and concurrent changes never disturb a pass already
//! in progress.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Type-erased change callback.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Set of registered callbacks. `None` once closed by disposal.
pub(crate) struct SubscriberSet {
    slots: Mutex<Option<HashMap<u64, ChangeCallback>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SubscriberSet {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Some(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a callback. Returns `None` if the set has been closed.
    pub(crate) fn insert(self: &Arc<Self>, callback: ChangeCallback) -> Option<ChangeRegistration> {
        let mut slots = self.slots.lock();
        let map = slots.as_mut()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        map.insert(id, callback);
        Some(ChangeRegistration {
            set: Arc::downgrade(self),
            id,
            disposed: AtomicBool::new(false),
        })
    }

    fn remove(&self, id: u64) -> bool {
        self.slots
            .lock()
            .as_mut()
            .is_some_and(|map| map.remove(&id).is_some())
    }

    /// Drop every callback and refuse further registrations.
    ///
    /// Returns the number of callbacks that were still registered.
    pub(crate) fn close(&self) -> usize {
        self.slots.lock().take().map_or(0, |map| map.len())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.slots.lock().is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().as_ref().map_or(0, HashMap::len)
    }

    fn snapshot(&self) -> Vec<ChangeCallback> {
        self.slots
            .lock()
            .as_ref()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Invoke every callback registered at the start of the pass exactly once.
    ///
    /// A panicking callback is logged and skipped; the others still run.
    /// Returns how many callbacks completed normally.
    pub(crate) fn notify_all(&self, target: &str) -> usize {
        let callbacks = self.snapshot();
        let total = callbacks.len();
        let mut completed = 0;

        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    warn!(
                        path = %target,
                        reason = panic_message(panic.as_ref()),
                        "change callback panicked; continuing with remaining subscribers"
                    );
                }
            }
        }

        debug!(path = %target, total, completed, "notified subscribers");
        completed
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Handle returned for every registered callback.
///
/// [`dispose`](Self::dispose) removes the callback; repeated calls are no-ops.
/// Dropping the handle disposes it too. Use [`detach`](Self::detach) to keep
/// the callback registered for the rest of the watcher's life.
#[must_use = "dropping a ChangeRegistration unregisters its callback"]
pub struct ChangeRegistration {
    set: Weak<SubscriberSet>,
    id: u64,
    disposed: AtomicBool,
}

impl ChangeRegistration {
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Give up the handle without unregistering the callback.
    pub fn detach(self) {
        self.disposed.store(true, Ordering::Release);
    }
}

impl Drop for ChangeRegistration {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ChangeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRegistration")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
