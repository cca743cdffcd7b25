// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{DEFAULT_POLL_INTERVAL, WatchOptions};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// root = "/etc/app-config"
/// poll_interval_ms = 30000
/// files = ["appsettings.json"]
/// ```
///
/// All fields are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Directory every file filter is resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Poll period in milliseconds. Must be non-zero.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Files to watch, relative to `root`.
    #[serde(default)]
    pub files: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            poll_interval_ms: default_poll_interval_ms(),
            files: Vec::new(),
        }
    }
}

impl RawConfigFile {
    /// Apply command-line overrides on top of the file values.
    ///
    /// Files given on the command line replace the configured list.
    pub fn with_overrides(
        mut self,
        root: Option<PathBuf>,
        files: Vec<String>,
        poll_interval_ms: Option<u64>,
    ) -> Self {
        if let Some(root) = root {
            self.watch.root = root;
        }
        if !files.is_empty() {
            self.watch.files = files;
        }
        if let Some(ms) = poll_interval_ms {
            self.watch.poll_interval_ms = ms;
        }
        self
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    options: WatchOptions,
    files: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(root: PathBuf, options: WatchOptions, files: Vec<String>) -> Self {
        Self {
            root,
            options,
            files,
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    /// Normalised file filters, deduplicated, in configuration order.
    pub fn files(&self) -> &[String] {
        &self.files
    }
}
