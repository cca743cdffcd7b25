// src/fs/mock.rs

use super::{FileMetadata, FileSystem};
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Clones share the same state, so a test can keep one handle to mutate files
/// while a watcher polls through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create or overwrite a file, creating parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock();
        entries.insert(path.clone(), MockEntry::File(content.into()));
        link_into_parent(&mut entries, &path);
    }

    /// Remove a file; its parent listing is updated.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock();
        if entries.remove(path).is_none() {
            return;
        }
        let parent = parent_or_dot(path);
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (entries.get_mut(parent), path.file_name().and_then(|n| n.to_str()))
        {
            children.retain(|c| c != name);
        }
    }

    /// Make reads of `path` fail (or succeed again) without removing it.
    pub fn set_read_failure(&self, path: impl AsRef<Path>, fail: bool) {
        let path = path.as_ref().to_path_buf();
        let mut failing = self.failing.lock();
        if fail {
            failing.insert(path);
        } else {
            failing.remove(&path);
        }
    }

    fn file_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        if self.failing.lock().contains(path) {
            return Err(anyhow!("Injected read failure: {:?}", path));
        }
        let entries = self.entries.lock();
        match entries.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

fn parent_or_dot(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => Path::new("."),
    }
}

/// Ensure every ancestor of `path` exists as a directory listing `path`.
fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let parent = parent_or_dot(path);
    if parent == path {
        return;
    }

    if !entries.contains_key(parent) {
        entries.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
        link_into_parent(entries, parent);
    }

    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.file_bytes(path)?)))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.file_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        match self.entries.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(FileMetadata {
                is_dir: false,
                len: content.len() as u64,
                modified: None,
            }),
            Some(MockEntry::Dir(_)) => Ok(FileMetadata {
                is_dir: true,
                len: 0,
                modified: None,
            }),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.entries.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                let mut paths: Vec<PathBuf> = children.iter().map(|name| path.join(name)).collect();
                paths.sort();
                Ok(paths)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_create_parent_listings() {
        let fs = MockFileSystem::new();
        fs.add_file("/cfg/nested/app.json", b"{}".to_vec());

        assert!(fs.is_dir(Path::new("/cfg")));
        assert!(fs.is_dir(Path::new("/cfg/nested")));
        assert_eq!(
            fs.read_dir(Path::new("/cfg")).unwrap(),
            vec![PathBuf::from("/cfg/nested")]
        );
        assert_eq!(fs.read_to_string(Path::new("/cfg/nested/app.json")).unwrap(), "{}");
    }

    #[test]
    fn remove_and_fail_reads() {
        let fs = MockFileSystem::new();
        fs.add_file("/cfg/app.json", b"a".to_vec());

        fs.set_read_failure("/cfg/app.json", true);
        assert!(fs.open(Path::new("/cfg/app.json")).is_err());
        assert!(fs.is_file(Path::new("/cfg/app.json")));

        fs.set_read_failure("/cfg/app.json", false);
        assert!(fs.open(Path::new("/cfg/app.json")).is_ok());

        fs.remove_file("/cfg/app.json");
        assert!(!fs.exists(Path::new("/cfg/app.json")));
        assert!(fs.read_dir(Path::new("/cfg")).unwrap().is_empty());
    }
}
