// src/watch/watcher.rs

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchError};
use crate::fs::FileSystem;
use crate::types::{LifecycleState, PollStats, WatchOptions};
use crate::watch::fingerprint::{Fingerprint, compute_fingerprint};
use crate::watch::stream::ChangeStream;
use crate::watch::subscribers::{ChangeCallback, ChangeRegistration, SubscriberSet};
use crate::watch::target::WatchTarget;

/// What a single poll cycle observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// First successful read; fingerprint stored, nobody notified.
    Baseline,
    Unchanged,
    Changed,
    /// Read failed; previous fingerprint kept.
    ReadFailed,
}

#[derive(Debug, Default)]
struct PollState {
    last_fingerprint: Option<Fingerprint>,
    has_changed: bool,
    stats: PollStats,
}

/// State shared between the public handle and the polling task.
#[derive(Debug)]
pub(crate) struct WatchCore {
    target: WatchTarget,
    fs: Arc<dyn FileSystem>,
    poll: Mutex<PollState>,
    subscribers: Arc<SubscriberSet>,
}

impl WatchCore {
    /// One poll cycle: read, fingerprint, compare, notify on transition.
    ///
    /// Blocking; the polling task runs it on tokio's blocking pool.
    pub(crate) fn check_for_changes(&self) -> PollOutcome {
        let path = self.target.full_path();

        let current = match compute_fingerprint(self.fs.as_ref(), &path) {
            Ok(fp) => fp,
            Err(err) => {
                let mut poll = self.poll.lock();
                poll.has_changed = false;
                poll.stats.polls += 1;
                poll.stats.read_failures += 1;
                warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "could not read watched file; skipping this cycle"
                );
                return PollOutcome::ReadFailed;
            }
        };

        let outcome = {
            let mut poll = self.poll.lock();
            poll.stats.polls += 1;
            let outcome = match poll.last_fingerprint {
                None => PollOutcome::Baseline,
                Some(previous) if previous != current => PollOutcome::Changed,
                Some(_) => PollOutcome::Unchanged,
            };
            poll.has_changed = outcome == PollOutcome::Changed;
            if poll.has_changed {
                poll.stats.changes += 1;
            }
            poll.last_fingerprint = Some(current);
            outcome
        };

        match outcome {
            PollOutcome::Baseline => {
                debug!(path = %path.display(), fingerprint = %current, "baseline fingerprint established");
            }
            PollOutcome::Changed => {
                info!(path = %path.display(), fingerprint = %current, "content change detected");
                self.subscribers.notify_all(self.target.filter());
            }
            _ => {}
        }

        outcome
    }

    fn stats(&self) -> PollStats {
        self.poll.lock().stats
    }
}

enum Lifecycle {
    Created,
    /// `None` when the target was missing at start (inert watcher).
    Started(Option<JoinHandle<()>>),
    Disposed,
}

/// Polls one file and notifies subscribers whenever its content changes.
///
/// Detection is purely content based: every `poll_interval` the file is read
/// in full and fingerprinted, so changes behind symlinks or bind mounts are
/// seen even when the visible path's metadata never moves.
///
/// Construction does no I/O. [`ensure_started`](Self::ensure_started) spawns
/// the polling task (once), and [`dispose`](Self::dispose) or dropping the
/// watcher stops it.
pub struct ChangeWatcher {
    core: Arc<WatchCore>,
    poll_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("target", &self.core.target)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    pub fn new(target: WatchTarget, options: WatchOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            core: Arc::new(WatchCore {
                target,
                fs,
                poll: Mutex::new(PollState::default()),
                subscribers: Arc::new(SubscriberSet::new()),
            }),
            poll_interval: options.poll_interval(),
            lifecycle: Mutex::new(Lifecycle::Created),
            cancel: CancellationToken::new(),
        }
    }

    /// Start polling if not already started.
    ///
    /// Safe to call any number of times from any thread; at most one polling
    /// task is ever spawned. If the target file does not exist yet, no task is
    /// spawned and the watcher stays inert for good: a later call will not
    /// re-check. Must be called from within a tokio runtime when the file
    /// exists.
    pub fn ensure_started(&self) -> Result<()> {
        match *self.lifecycle.lock() {
            Lifecycle::Created => {}
            Lifecycle::Started(_) => return Ok(()),
            Lifecycle::Disposed => return Err(self.disposed_error()),
        }

        // Stat outside the lifecycle lock; dispose() may run meanwhile.
        let path = self.core.target.full_path();
        let present = self.core.fs.is_file(&path);

        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Started(_) => return Ok(()),
            Lifecycle::Disposed => return Err(self.disposed_error()),
        }

        if !present {
            info!(path = %path.display(), "watched file does not exist; watcher stays inert");
            *lifecycle = Lifecycle::Started(None);
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let task = runtime.spawn(poll_loop(
            Arc::clone(&self.core),
            self.poll_interval,
            self.cancel.clone(),
        ));

        info!(
            path = %path.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "content watcher started"
        );
        *lifecycle = Lifecycle::Started(Some(task));
        Ok(())
    }

    /// Register `callback`, invoked with `state` on every detected change.
    pub fn register_change_callback<S, F>(&self, callback: F, state: S) -> Result<ChangeRegistration>
    where
        S: Send + Sync + 'static,
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.on_change(move || callback(&state))
    }

    /// Register a stateless callback invoked on every detected change.
    pub fn on_change<F>(&self, callback: F) -> Result<ChangeRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Arc::new(callback))
    }

    fn register(&self, callback: ChangeCallback) -> Result<ChangeRegistration> {
        self.core
            .subscribers
            .insert(callback)
            .ok_or_else(|| self.disposed_error())
    }

    /// Receive every detected change through an async channel.
    ///
    /// Each item is the change generation (see [`PollStats::changes`]). The
    /// stream ends once the watcher is disposed.
    pub fn changes(&self) -> Result<ChangeStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let core: Weak<WatchCore> = Arc::downgrade(&self.core);
        let registration = self.on_change(move || {
            if let Some(core) = core.upgrade() {
                let _ = tx.send(core.stats().changes);
            }
        })?;
        Ok(ChangeStream::new(registration, rx))
    }

    /// Whether the most recent completed poll observed a transition.
    pub fn has_changed(&self) -> bool {
        self.core.poll.lock().has_changed
    }

    /// Fingerprint from the last successful read, if any.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.core.poll.lock().last_fingerprint
    }

    pub fn stats(&self) -> PollStats {
        self.core.stats()
    }

    pub fn target(&self) -> &WatchTarget {
        &self.core.target
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscribers.len()
    }

    pub fn state(&self) -> LifecycleState {
        match *self.lifecycle.lock() {
            Lifecycle::Created => LifecycleState::Created,
            Lifecycle::Started(_) => LifecycleState::Started,
            Lifecycle::Disposed => LifecycleState::Disposed,
        }
    }

    pub fn is_started(&self) -> bool {
        self.state() == LifecycleState::Started
    }

    /// Started, but without a polling task because the file was missing.
    pub fn is_inert(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Started(None))
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == LifecycleState::Disposed
    }

    /// Stop polling and drop every subscriber. Idempotent.
    ///
    /// An in-flight read is not waited for; it finishes on the blocking pool
    /// but can no longer notify anyone.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Disposed);
        if matches!(previous, Lifecycle::Disposed) {
            return;
        }

        self.cancel.cancel();
        if let Lifecycle::Started(Some(task)) = previous {
            task.abort();
        }
        let dropped = self.core.subscribers.close();

        debug!(
            path = %self.core.target,
            dropped_subscribers = dropped,
            "content watcher disposed"
        );
    }

    fn disposed_error(&self) -> WatchError {
        WatchError::Disposed(self.core.target.filter().to_string())
    }

    #[cfg(test)]
    pub(crate) fn poll_once(&self) -> PollOutcome {
        self.core.check_for_changes()
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Framework-neutral view of a watcher for configuration consumers.
pub trait ChangeSignal: Send + Sync {
    /// Snapshot of the last poll's edge flag.
    fn has_changed(&self) -> bool;

    /// Subscribe to change notifications.
    fn on_change(&self, callback: ChangeCallback) -> Result<ChangeRegistration>;
}

impl ChangeSignal for ChangeWatcher {
    fn has_changed(&self) -> bool {
        ChangeWatcher::has_changed(self)
    }

    fn on_change(&self, callback: ChangeCallback) -> Result<ChangeRegistration> {
        self.register(callback)
    }
}

async fn poll_loop(core: Arc<WatchCore>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let cycle = Arc::clone(&core);
        if let Err(err) = tokio::task::spawn_blocking(move || cycle.check_for_changes()).await {
            warn!(path = %core.target, error = %err, "poll cycle aborted");
        }
    }

    debug!(path = %core.target, "polling stopped");
}
