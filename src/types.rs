use std::time::Duration;

use crate::errors::{Result, WatchError};

/// Poll period used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);

/// Tunables shared by every watcher a registry creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchOptions {
    /// Options with a custom poll interval. A zero interval is rejected.
    pub fn with_poll_interval(poll_interval: Duration) -> Result<Self> {
        if poll_interval.is_zero() {
            return Err(WatchError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(WatchOptions { poll_interval })
    }

    pub fn from_millis(ms: u64) -> Result<Self> {
        Self::with_poll_interval(Duration::from_millis(ms))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Lifecycle of a single watcher.
///
/// `Created -> Started` happens at most once; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Disposed,
}

/// Counters kept by a watcher's polling task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Completed poll cycles, failed reads included.
    pub polls: u64,
    /// Detected content transitions; also the change generation number.
    pub changes: u64,
    pub read_failures: u64,
}
