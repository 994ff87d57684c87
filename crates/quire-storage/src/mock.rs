//! In-memory storage for tests.

use std::collections::BTreeMap;
use std::sync::{RwLock, mpsc};

use crate::event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
use crate::storage::{DOCS_DIR, Storage, StorageError};

/// Storage backed by an in-memory map of pathname to content.
///
/// ```ignore
/// use quire_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new()
///     .with_file("docs/index.md", "---\ntitle: Home\n---\n")
///     .with_file("docs/config.yml", "nav: []\nicon: {}\n");
/// assert_eq!(storage.scan()?, vec!["docs/index.md"]);
/// ```
#[derive(Debug, Default)]
pub struct MockStorage {
    files: RwLock<BTreeMap<String, String>>,
    event_sender: RwLock<Option<mpsc::Sender<StorageEvent>>>,
}

impl MockStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, pathname: impl Into<String>, content: impl Into<String>) -> Self {
        self.write(pathname, content);
        self
    }

    /// Create or replace a file without emitting an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn write(&self, pathname: impl Into<String>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap()
            .insert(pathname.into(), content.into());
    }

    /// Delete a file without emitting an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove(&self, pathname: &str) {
        self.files.write().unwrap().remove(pathname);
    }

    /// Send an event to the active watcher, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn emit(&self, pathname: impl Into<String>, kind: StorageEventKind) {
        if let Some(sender) = self.event_sender.read().unwrap().as_ref() {
            let _ = sender.send(StorageEvent::new(pathname, kind));
        }
    }
}

impl Storage for MockStorage {
    fn scan(&self) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{DOCS_DIR}/");
        Ok(self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(&prefix) && p.ends_with(".md"))
            .cloned()
            .collect())
    }

    fn read(&self, pathname: &str) -> Result<String, StorageError> {
        self.files
            .read()
            .unwrap()
            .get(pathname)
            .cloned()
            .ok_or_else(|| StorageError::not_found(pathname).with_backend("Mock"))
    }

    fn exists(&self, pathname: &str) -> bool {
        self.files.read().unwrap().contains_key(pathname)
    }

    fn watch(&self) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (tx, rx) = mpsc::channel();
        *self.event_sender.write().unwrap() = Some(tx);
        Ok((StorageEventReceiver::new(rx), WatchHandle::no_op()))
    }
}
