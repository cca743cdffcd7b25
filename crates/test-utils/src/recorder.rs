use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts how often a change callback fired.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    hits: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback suitable for `ChangeWatcher::on_change`.
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let hits = Arc::clone(&self.hits);
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
