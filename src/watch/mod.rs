// src/watch/mod.rs

//! Content-based change detection.
//!
//! This module is responsible for:
//! - Fingerprinting file content (`blake3`).
//! - Polling a single file and turning content transitions into
//!   edge-triggered notifications ([`ChangeWatcher`]).
//! - Keeping at most one live watcher per target ([`WatchRegistry`]).
//!
//! It never relies on timestamps or OS change events, so it keeps working
//! for files behind symlinks and bind mounts (e.g. Kubernetes ConfigMap
//! volumes) where only the resolved content changes.

pub mod fingerprint;
pub mod registry;
pub mod stream;
pub mod subscribers;
pub mod target;
pub mod watcher;

pub use fingerprint::{Fingerprint, compute_fingerprint};
pub use registry::WatchRegistry;
pub use stream::ChangeStream;
pub use subscribers::{ChangeCallback, ChangeRegistration};
pub use target::{WatchTarget, normalize_filter};
pub use watcher::{ChangeSignal, ChangeWatcher};
