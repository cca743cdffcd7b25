// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchError};
use crate::types::WatchOptions;
use crate::watch::target::normalize_filter;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let options = validate_poll_interval(&raw)?;
        let files = validate_files(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch.root, options, files))
    }
}

fn validate_poll_interval(cfg: &RawConfigFile) -> Result<WatchOptions> {
    WatchOptions::from_millis(cfg.watch.poll_interval_ms).map_err(|_| {
        WatchError::ConfigError(format!(
            "[watch].poll_interval_ms must be >= 1 (got {})",
            cfg.watch.poll_interval_ms
        ))
    })
}

fn validate_files(cfg: &RawConfigFile) -> Result<Vec<String>> {
    if cfg.watch.files.is_empty() {
        return Err(WatchError::ConfigError(
            "no files to watch: set [watch].files or pass --file".to_string(),
        ));
    }

    let mut files: Vec<String> = Vec::with_capacity(cfg.watch.files.len());
    for file in cfg.watch.files.iter() {
        let normalized = normalize_filter(file).map_err(|err| {
            WatchError::ConfigError(format!("invalid entry in [watch].files: {err}"))
        })?;
        if !files.contains(&normalized) {
            files.push(normalized);
        }
    }
    Ok(files)
}
