// src/watch/stream.rs

//! Async adapter over change callbacks.

use tokio::sync::mpsc;

use crate::watch::subscribers::ChangeRegistration;

/// Stream of change generations for one watcher.
///
/// Owns its registration: dropping the stream unsubscribes.
#[derive(Debug)]
pub struct ChangeStream {
    registration: ChangeRegistration,
    rx: mpsc::UnboundedReceiver<u64>,
}

impl ChangeStream {
    pub(crate) fn new(registration: ChangeRegistration, rx: mpsc::UnboundedReceiver<u64>) -> Self {
        Self { registration, rx }
    }

    /// Wait for the next detected change.
    ///
    /// Returns `None` once the watcher has been disposed.
    pub async fn next(&mut self) -> Option<u64> {
        self.rx.recv().await
    }

    /// Take an already delivered change without waiting.
    pub fn try_next(&mut self) -> Option<u64> {
        self.rx.try_recv().ok()
    }

    /// Unsubscribe; pending items can still be drained.
    pub fn close(&mut self) {
        self.registration.dispose();
        self.rx.close();
    }
}
