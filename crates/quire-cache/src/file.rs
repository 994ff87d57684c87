//! Directory-backed cache.
//!
//! Layout under the root:
//!
//! ```text
//! {root}/VERSION          cache format version
//! {root}/{bucket}/{key}   one entry: etag line, then raw bytes
//! ```
//!
//! A root whose `VERSION` differs from the running build is wiped on open.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::{Cache, CacheBucket};

/// [`Cache`] persisted on the local filesystem.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open (or initialise) the cache at `root` for the given format `version`.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        ensure_version(&root, version);
        Self { root }
    }

    /// Root directory of the cache.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileBucket {
            dir: self.root.join(name),
        })
    }
}

struct FileBucket {
    dir: PathBuf,
}

impl CacheBucket for FileBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let file = fs::File::open(self.dir.join(key)).ok()?;
        let mut reader = BufReader::new(file);

        let mut stored = String::new();
        reader.read_line(&mut stored).ok()?;
        let stored = stored.strip_suffix('\n')?;
        if !etag.is_empty() && stored != etag {
            tracing::debug!(key, stored, etag, "cache etag mismatch");
            return None;
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        // Etags are single-line by construction; a newline would corrupt the header.
        if etag.contains('\n') {
            return;
        }
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create cache bucket");
            return;
        }

        let mut buf = Vec::with_capacity(etag.len() + 1 + value.len());
        buf.extend_from_slice(etag.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(value);

        if let Err(e) = fs::write(self.dir.join(key), buf) {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }
}

fn ensure_version(root: &Path, version: &str) {
    let marker = root.join("VERSION");
    match fs::read_to_string(&marker) {
        Ok(stored) if stored == version => {
            tracing::debug!(version, "cache version up to date");
            return;
        }
        Ok(stored) => tracing::info!(stored = %stored, version, "cache version changed, clearing cache"),
        Err(_) => tracing::info!(root = %root.display(), "initialising cache"),
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!(error = %e, "failed to clear cache directory");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!(error = %e, "failed to create cache directory");
        return;
    }
    if let Err(e) = fs::write(&marker, version) {
        tracing::warn!(error = %e, "failed to write cache VERSION");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_roundtrip_and_etag_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache"), "1");
        let bucket = cache.bucket("typeset");

        bucket.set("abc", "typst", b"<svg>\n</svg>");

        assert_eq!(bucket.get("abc", "typst"), Some(b"<svg>\n</svg>".to_vec()));
        assert_eq!(bucket.get("abc", ""), Some(b"<svg>\n</svg>".to_vec()));
        assert_eq!(bucket.get("abc", "kroki"), None);
        assert_eq!(bucket.get("missing", "typst"), None);
    }

    #[test]
    fn test_version_change_wipes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");

        FileCache::new(root.clone(), "1")
            .bucket("typeset")
            .set("k", "e", b"v");
        let reopened = FileCache::new(root.clone(), "1");
        assert_eq!(reopened.bucket("typeset").get("k", "e"), Some(b"v".to_vec()));

        let upgraded = FileCache::new(root.clone(), "2");
        assert_eq!(upgraded.bucket("typeset").get("k", "e"), None);
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "2");
    }

    #[test]
    fn test_multiline_etag_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FileCache::new(dir.path().to_path_buf(), "1").bucket("b");

        bucket.set("k", "a\nb", b"v");

        assert_eq!(bucket.get("k", ""), None);
    }
}
