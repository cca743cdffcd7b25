// src/watch/target.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::errors::{Result, WatchError};

/// `(root, relative filter)` pair identifying one watched file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchTarget {
    root: PathBuf,
    filter: String,
}

impl WatchTarget {
    /// Build a target, normalising `filter` with [`normalize_filter`].
    pub fn new(root: impl Into<PathBuf>, filter: &str) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            filter: normalize_filter(filter)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalised relative filter; also the registry key.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.filter)
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path().display())
    }
}

/// Normalise a relative path into the form used as a registry key.
///
/// Backslashes become `/` and a leading `/` or `./` is dropped. The result
/// must stay inside the root: empty filters and `..` components are rejected.
pub fn normalize_filter(filter: &str) -> Result<String> {
    let replaced = filter.trim().replace('\\', "/");
    let trimmed = replaced.trim_start_matches('/');

    let mut parts = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(WatchError::InvalidPath(format!(
                    "'{filter}' escapes the watch root"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(WatchError::InvalidPath(format!(
                    "'{filter}' is not a relative path"
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(WatchError::InvalidPath(format!(
            "'{filter}' does not name a file"
        )));
    }

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_separators_and_leading_markers() {
        assert_eq!(normalize_filter("appsettings.json").unwrap(), "appsettings.json");
        assert_eq!(normalize_filter("/appsettings.json").unwrap(), "appsettings.json");
        assert_eq!(normalize_filter("./conf/app.json").unwrap(), "conf/app.json");
        assert_eq!(normalize_filter("conf\\app.json").unwrap(), "conf/app.json");
        assert_eq!(normalize_filter("conf//app.json").unwrap(), "conf/app.json");
    }

    #[test]
    fn rejects_escaping_and_empty_filters() {
        assert!(matches!(
            normalize_filter("../secret"),
            Err(WatchError::InvalidPath(_))
        ));
        assert!(matches!(
            normalize_filter("conf/../../x"),
            Err(WatchError::InvalidPath(_))
        ));
        assert!(matches!(normalize_filter(""), Err(WatchError::InvalidPath(_))));
        assert!(matches!(normalize_filter("./"), Err(WatchError::InvalidPath(_))));
    }

    #[test]
    fn full_path_joins_root_and_filter() {
        let target = WatchTarget::new("/etc/config", "/app.json").unwrap();
        assert_eq!(target.full_path(), PathBuf::from("/etc/config/app.json"));
        assert_eq!(target.filter(), "app.json");
    }
}
