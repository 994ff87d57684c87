//! Output directory access.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use quire_renderer::ArtifactSink;

/// Writes artifacts below an output directory, imported through an alias.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
    alias: String,
}

impl OutputSink {
    /// Sink for `dir`, visible to the consumer as `alias` (e.g. `@cache`).
    #[must_use]
    pub fn new(dir: PathBuf, alias: impl Into<String>) -> Self {
        Self {
            dir,
            alias: alias.into(),
        }
    }
}

impl ArtifactSink for OutputSink {
    fn write(&self, rel: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)
    }

    fn remove(&self, rel: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.dir.join(rel)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn import_path(&self, rel: &str) -> String {
        format!("{}/{rel}", self.alias.trim_end_matches('/'))
    }
}

/// In-memory sink, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content written at `rel`, as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn read(&self, rel: &str) -> Option<String> {
        let files = self.files.lock().unwrap();
        files
            .get(rel)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Every path written so far, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Forget every file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.files.lock().unwrap().clear();
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, rel: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(rel.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, rel: &str) -> std::io::Result<()> {
        self.files.lock().unwrap().remove(rel);
        Ok(())
    }

    fn import_path(&self, rel: &str) -> String {
        format!("@cache/{rel}")
    }
}
