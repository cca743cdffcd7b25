// src/watch/fingerprint.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Content digest of a whole file.
///
/// Only ever compared for equality; the bytes carry no other meaning.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(bytes);
        Self(hasher.finalize())
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.0.to_hex()[..12])
    }
}

/// Stream the whole of `path` through `fs` into the hasher.
pub fn compute_fingerprint(fs: &dyn FileSystem, path: &Path) -> Result<Fingerprint> {
    let mut reader = fs.open(path)?;
    let mut hasher = Hasher::new();
    hasher
        .update_reader(&mut reader)
        .with_context(|| format!("hashing file {:?}", path))?;
    Ok(Fingerprint(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn known_digest_of_hello_world() {
        let fs = MockFileSystem::new();
        fs.add_file("test.txt", b"hello world".to_vec());

        let fp = compute_fingerprint(&fs, Path::new("test.txt")).unwrap();
        // blake3 hash of "hello world"
        assert_eq!(
            fp.to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn equal_content_equal_fingerprint() {
        let a = Fingerprint::of_bytes(br#"{"level":"Error"}"#);
        let b = Fingerprint::of_bytes(br#"{"level":"Error"}"#);
        let c = Fingerprint::of_bytes(br#"{"level":"Debug"}"#);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn streamed_fingerprint_matches_whole_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.json");
        // several read buffers' worth, with a ragged tail
        let content: Vec<u8> = (0..200_003u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let streamed = compute_fingerprint(&RealFileSystem, &path).unwrap();
        assert_eq!(streamed, Fingerprint::of_bytes(&content));
    }

    #[test]
    fn missing_file_is_an_error() {
        let fs = MockFileSystem::new();
        assert!(compute_fingerprint(&fs, Path::new("nope.json")).is_err());
    }
}
