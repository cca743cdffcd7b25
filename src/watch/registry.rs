// src/watch/registry.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::errors::{Result, WatchError};
use crate::fs::{FileInfo, FileSystem, RealFileSystem};
use crate::types::WatchOptions;
use crate::watch::target::{WatchTarget, normalize_filter};
use crate::watch::watcher::ChangeWatcher;

/// Owns the live [`ChangeWatcher`]s under one root directory.
///
/// Keys are normalised relative filters; at most one live watcher exists per
/// key. Watchers are created lazily by [`watch`](Self::watch) and replaced
/// only through [`rewatch`](Self::rewatch). Dropping the registry disposes
/// every watcher it still owns.
#[derive(Debug)]
pub struct WatchRegistry {
    root: PathBuf,
    options: WatchOptions,
    fs: Arc<dyn FileSystem>,
    watchers: DashMap<String, Arc<ChangeWatcher>>,
}

impl WatchRegistry {
    /// Registry over the real filesystem.
    pub fn new(root: impl Into<PathBuf>, options: WatchOptions) -> Self {
        Self::with_fs(root, options, Arc::new(RealFileSystem))
    }

    pub fn with_fs(root: impl Into<PathBuf>, options: WatchOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            options,
            fs,
            watchers: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    /// Return the live watcher for `filter`, creating it if needed, and make
    /// sure it has been started.
    ///
    /// Concurrent calls for the same new key get the same watcher. A watcher
    /// that was disposed behind the registry's back is replaced.
    pub fn watch(&self, filter: &str) -> Result<Arc<ChangeWatcher>> {
        let target = WatchTarget::new(&self.root, filter)?;

        loop {
            let watcher = match self.watchers.entry(target.filter().to_string()) {
                Entry::Occupied(mut entry) => {
                    if entry.get().is_disposed() {
                        debug!(path = %target, "replacing disposed watcher");
                        let fresh = self.new_watcher(target.clone());
                        entry.insert(Arc::clone(&fresh));
                        fresh
                    } else {
                        Arc::clone(entry.get())
                    }
                }
                Entry::Vacant(entry) => {
                    debug!(path = %target, "creating watcher");
                    let fresh = self.new_watcher(target.clone());
                    entry.insert(Arc::clone(&fresh));
                    fresh
                }
            };

            // Started outside the shard lock; a concurrent rewatch may have
            // disposed this one in between, in which case look again.
            match watcher.ensure_started() {
                Ok(()) => return Ok(watcher),
                Err(WatchError::Disposed(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Replace the watcher for `filter` with a fresh one.
    ///
    /// The previous watcher, if any, is disposed and its subscribers stop
    /// receiving notifications. The new watcher starts from a clean baseline;
    /// this is also the way to retry a watcher that went inert because its
    /// file did not exist yet.
    pub fn rewatch(&self, filter: &str) -> Result<Arc<ChangeWatcher>> {
        let target = WatchTarget::new(&self.root, filter)?;
        let fresh = self.new_watcher(target.clone());

        if let Some(previous) = self
            .watchers
            .insert(target.filter().to_string(), Arc::clone(&fresh))
        {
            previous.dispose();
            info!(path = %target, "replaced watcher");
        }

        fresh.ensure_started()?;
        Ok(fresh)
    }

    /// Live watcher for `filter`, without creating one.
    pub fn get(&self, filter: &str) -> Option<Arc<ChangeWatcher>> {
        let key = normalize_filter(filter).ok()?;
        self.watchers
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|watcher| !watcher.is_disposed())
    }

    /// Remove and dispose the watcher for `filter`. Returns whether one existed.
    pub fn unwatch(&self, filter: &str) -> Result<bool> {
        let key = normalize_filter(filter)?;
        match self.watchers.remove(&key) {
            Some((_, watcher)) => {
                watcher.dispose();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Dispose every watcher and empty the registry.
    pub fn shutdown(&self) {
        let keys: Vec<String> = self.watchers.iter().map(|entry| entry.key().clone()).collect();
        let mut disposed = 0;
        for key in keys {
            if let Some((_, watcher)) = self.watchers.remove(&key) {
                watcher.dispose();
                disposed += 1;
            }
        }
        if disposed > 0 {
            info!(root = %self.root.display(), disposed, "watch registry shut down");
        }
    }

    /// File info for `subpath` under the root. Missing paths report
    /// `exists == false`.
    pub fn get_file_info(&self, subpath: &str) -> Result<FileInfo> {
        let path = self.resolve(subpath)?;
        Ok(FileInfo::stat(self.fs.as_ref(), &path))
    }

    /// Entries of the directory at `subpath`, sorted by path. A missing
    /// directory yields an empty listing.
    pub fn get_directory_contents(&self, subpath: &str) -> Result<Vec<FileInfo>> {
        let dir = self.resolve(subpath)?;
        if !self.fs.is_dir(&dir) {
            return Ok(Vec::new());
        }

        let entries = self.fs.read_dir(&dir)?;
        Ok(entries
            .iter()
            .map(|path| FileInfo::stat(self.fs.as_ref(), path))
            .collect())
    }

    fn resolve(&self, subpath: &str) -> Result<PathBuf> {
        let trimmed = subpath.trim();
        if trimmed.is_empty() || trimmed == "/" || trimmed == "." {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(normalize_filter(trimmed)?))
    }

    fn new_watcher(&self, target: WatchTarget) -> Arc<ChangeWatcher> {
        Arc::new(ChangeWatcher::new(target, self.options, Arc::clone(&self.fs)))
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::time::Duration;

    fn registry(fs: &MockFileSystem) -> WatchRegistry {
        let options = WatchOptions::with_poll_interval(Duration::from_secs(3600)).unwrap();
        WatchRegistry::with_fs("/config", options, Arc::new(fs.clone()))
    }

    #[tokio::test]
    async fn same_key_returns_same_watcher() {
        let fs = MockFileSystem::new();
        fs.add_file("/config/app.json", b"{}".to_vec());
        let registry = registry(&fs);

        let a = registry.watch("app.json").unwrap();
        let b = registry.watch("/app.json").unwrap();
        let c = registry.watch("./app.json").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert!(a.is_started());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn rewatch_disposes_previous() {
        let fs = MockFileSystem::new();
        fs.add_file("/config/app.json", b"{}".to_vec());
        let registry = registry(&fs);

        let old = registry.watch("app.json").unwrap();
        let fresh = registry.rewatch("app.json").unwrap();

        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(old.is_disposed());
        assert!(fresh.is_started());
        assert!(Arc::ptr_eq(&registry.get("app.json").unwrap(), &fresh));
        assert!(Arc::ptr_eq(&registry.watch("app.json").unwrap(), &fresh));
    }

    #[test]
    fn rewatch_revives_inert_watcher() {
        let fs = MockFileSystem::new();
        let registry = registry(&fs);

        let inert = registry.watch("late.json").unwrap();
        assert!(inert.is_inert());

        // still missing: the replacement is inert as well, no runtime needed
        let again = registry.rewatch("late.json").unwrap();
        assert!(again.is_inert());
        assert!(inert.is_disposed());
    }

    #[test]
    fn externally_disposed_watcher_is_replaced() {
        let fs = MockFileSystem::new();
        let registry = registry(&fs);

        let first = registry.watch("missing.json").unwrap();
        first.dispose();
        assert!(registry.get("missing.json").is_none());

        let second = registry.watch("missing.json").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!second.is_disposed());
    }

    #[test]
    fn unwatch_and_shutdown_dispose() {
        let fs = MockFileSystem::new();
        let registry = registry(&fs);

        let a = registry.watch("a.json").unwrap();
        let b = registry.watch("b.json").unwrap();
        assert!(registry.unwatch("a.json").unwrap());
        assert!(!registry.unwatch("a.json").unwrap());
        assert!(a.is_disposed());

        registry.shutdown();
        assert!(b.is_disposed());
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_filters_are_rejected() {
        let fs = MockFileSystem::new();
        let registry = registry(&fs);

        assert!(matches!(registry.watch("../etc/passwd"), Err(WatchError::InvalidPath(_))));
        assert!(matches!(registry.get_file_info("../x"), Err(WatchError::InvalidPath(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn file_info_and_listing_pass_through() {
        let fs = MockFileSystem::new();
        fs.add_file("/config/app.json", b"{\"a\":1}".to_vec());
        fs.add_file("/config/nested/inner.json", b"{}".to_vec());
        let registry = registry(&fs);

        let info = registry.get_file_info("app.json").unwrap();
        assert!(info.exists);
        assert!(!info.is_directory);
        assert_eq!(info.length, 7);
        assert_eq!(info.name, "app.json");

        let missing = registry.get_file_info("nope.json").unwrap();
        assert!(!missing.exists);

        let names: Vec<String> = registry
            .get_directory_contents("")
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["app.json", "nested"]);

        assert!(registry.get_directory_contents("absent").unwrap().is_empty());
    }
}
