//! Filesystem storage rooted at a project directory.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};

use crate::debouncer::EventDebouncer;
use crate::event::{StorageEventKind, StorageEventReceiver, WatchHandle};
use crate::storage::{DOCS_DIR, SITE_CONFIG, Storage, StorageError, StorageErrorKind};

const BACKEND: &str = "Fs";

/// How often the drain thread checks for settled events.
const DRAIN_INTERVAL: Duration = Duration::from_millis(25);

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Storage over a project directory containing `docs/`.
///
/// ```ignore
/// use quire_storage::{FsStorage, Storage};
///
/// let storage = FsStorage::new("site".into());
/// for pathname in storage.scan()? {
///     println!("{pathname}");
/// }
/// ```
pub struct FsStorage {
    root: PathBuf,
    watch_patterns: Vec<Pattern>,
    debounce: Duration,
}

impl FsStorage {
    /// Storage over `root`, watching documents and the site configuration.
    ///
    /// # Panics
    ///
    /// Panics if the built-in watch patterns fail to compile.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let watch_patterns = [format!("{DOCS_DIR}/**/*.md").as_str(), SITE_CONFIG]
            .iter()
            .map(|p| Pattern::new(p).expect("built-in pattern"))
            .collect();
        Self {
            root,
            watch_patterns,
            debounce: Duration::from_millis(100),
        }
    }

    /// Set the quiet period used to coalesce change notifications.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a pathname below the root, rejecting escapes.
    fn resolve(&self, pathname: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(pathname);
        let escapes = path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(self.root.join(path))
    }
}

/// Convert a path below `root` to a `/`-separated pathname.
fn to_pathname(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

impl Storage for FsStorage {
    fn scan(&self) -> Result<Vec<String>, StorageError> {
        let docs = self.root.join(DOCS_DIR);
        if !docs.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!("{}/**/*.md", Pattern::escape(&docs.to_string_lossy()));
        let paths = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_path(&docs)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        let mut pathnames = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => {
                    if let Some(pathname) = to_pathname(&self.root, &path) {
                        pathnames.push(pathname);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %e.path().display(), error = %e, "skipping unreadable path");
                }
            }
        }
        pathnames.sort();
        Ok(pathnames)
    }

    fn read(&self, pathname: &str) -> Result<String, StorageError> {
        let full = self.resolve(pathname)?;
        fs::read_to_string(&full).map_err(|e| StorageError::io(e, pathname).with_backend(BACKEND))
    }

    fn exists(&self, pathname: &str) -> bool {
        self.resolve(pathname).is_ok_and(|p| p.is_file())
    }

    fn watch(&self) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let debouncer = Arc::new(EventDebouncer::new(self.debounce));
        let root = self.root.clone();
        let patterns = self.watch_patterns.clone();
        let recorder = Arc::clone(&debouncer);

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "watcher error");
                        return;
                    }
                };
                for path in event.paths {
                    let kind = match event.kind {
                        EventKind::Create(_) => StorageEventKind::Created,
                        // Renames report both ends; existence tells them apart.
                        EventKind::Modify(ModifyKind::Name(_)) if path.exists() => {
                            StorageEventKind::Created
                        }
                        EventKind::Modify(ModifyKind::Name(_)) => StorageEventKind::Removed,
                        EventKind::Modify(_) => StorageEventKind::Modified,
                        EventKind::Remove(_) => StorageEventKind::Removed,
                        _ => continue,
                    };
                    let Some(pathname) = to_pathname(&root, &path) else {
                        continue;
                    };
                    if patterns
                        .iter()
                        .any(|p| p.matches_with(&pathname, MATCH_OPTIONS))
                    {
                        recorder.record(pathname, kind);
                    }
                }
            })
            .map_err(|e| {
                StorageError::new(StorageErrorKind::WatchUnavailable)
                    .with_backend(BACKEND)
                    .with_source(e)
            })?;

        let docs = self.root.join(DOCS_DIR);
        watcher
            .watch(&docs, RecursiveMode::Recursive)
            .map_err(|e| {
                StorageError::new(StorageErrorKind::WatchUnavailable)
                    .with_path(&docs)
                    .with_backend(BACKEND)
                    .with_source(e)
            })?;
        tracing::debug!(dir = %docs.display(), "watching documents");

        std::thread::spawn(move || {
            let _watcher = watcher;
            loop {
                match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
                for event in debouncer.drain_ready() {
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((
            StorageEventReceiver::new(event_rx),
            WatchHandle::new(shutdown_tx),
        ))
    }
}
