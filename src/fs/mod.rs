// src/fs/mod.rs

//! Filesystem access used by the watchers and the registry passthroughs.
//!
//! Everything that touches the disk goes through [`FileSystem`], so tests can
//! swap in [`mock::MockFileSystem`] and drive polling deterministically.

use std::fmt::Debug;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// Metadata for a single path, with symlinks already followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Open a file for streaming reads, following symlinks.
    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(FileMetadata {
            is_dir: meta.is_dir(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }
}

/// Result of a file-info or directory-listing query on the registry.
///
/// A path that does not exist is reported with `exists == false` rather than
/// as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    pub is_directory: bool,
    pub length: u64,
    pub last_modified: Option<SystemTime>,
}

impl FileInfo {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            exists: false,
            is_directory: false,
            length: 0,
            last_modified: None,
        }
    }

    pub fn from_metadata(path: impl Into<PathBuf>, meta: &FileMetadata) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            exists: true,
            is_directory: meta.is_dir,
            length: if meta.is_dir { 0 } else { meta.len },
            last_modified: meta.modified,
        }
    }

    /// Stat `path` through `fs`, mapping any failure to a not-found entry.
    pub fn stat(fs: &dyn FileSystem, path: &Path) -> Self {
        match fs.metadata(path) {
            Ok(meta) => Self::from_metadata(path, &meta),
            Err(_) => Self::not_found(path),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
