use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Replace `path` atomically: write a sibling temp file, then rename it over.
///
/// Pollers never observe a half-written file this way.
pub fn write_atomic(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .with_context(|| format!("{:?} has no parent directory", path))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_ref())?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("renaming temp file over {:?}", path))?;
    Ok(())
}

#[cfg(unix)]
pub use configmap::ConfigMapDir;

#[cfg(unix)]
mod configmap {
    use std::fs;
    use std::os::unix::fs::symlink;
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use tempfile::TempDir;

    const DATA_LINK: &str = "..data";

    /// Reproduces the directory layout of a Kubernetes ConfigMap volume.
    ///
    /// ```text
    /// root/
    ///   ..v1/appsettings.json
    ///   ..data -> ..v1
    ///   appsettings.json -> ..data/appsettings.json
    /// ```
    ///
    /// [`update`](Self::update) writes a new version directory and swaps the
    /// `..data` link with a rename, so the visible `appsettings.json` symlink
    /// itself never changes.
    pub struct ConfigMapDir {
        dir: TempDir,
        version: u32,
    }

    impl ConfigMapDir {
        pub fn new(files: &[(&str, &str)]) -> Result<Self> {
            let mut cm = Self {
                dir: TempDir::new()?,
                version: 0,
            };
            cm.publish(files)?;
            for (name, _) in files {
                symlink(Path::new(DATA_LINK).join(name), cm.root().join(name))
                    .with_context(|| format!("linking {name}"))?;
            }
            Ok(cm)
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        /// Publish a new version of every file.
        pub fn update(&mut self, files: &[(&str, &str)]) -> Result<()> {
            self.publish(files)
        }

        fn publish(&mut self, files: &[(&str, &str)]) -> Result<()> {
            let previous = self.version_dir(self.version);
            self.version += 1;
            let next_name = format!("..v{}", self.version);
            let next = self.root().join(&next_name);

            fs::create_dir(&next)?;
            for (name, contents) in files {
                fs::write(next.join(name), contents)?;
            }

            let tmp_link = self.root().join("..data_tmp");
            symlink(&next_name, &tmp_link)?;
            fs::rename(&tmp_link, self.root().join(DATA_LINK))?;

            if self.version > 1 {
                fs::remove_dir_all(previous)?;
            }
            Ok(())
        }

        fn version_dir(&self, version: u32) -> PathBuf {
            self.root().join(format!("..v{version}"))
        }
    }
}
