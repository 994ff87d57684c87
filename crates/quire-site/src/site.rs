//! Site orchestration.
//!
//! [`Site`] owns every [`Entry`] and writes the derived artifacts:
//!
//! | File | Content |
//! |---|---|
//! | `config.json` | resolved navigation and category icons |
//! | `routes.json` | route table, 404 last |
//! | `search.json` | search bundle |
//! | `posts/<rel>.vue` | one output unit per document |
//!
//! [`Site::build`] does a full pass. [`Site::apply`] handles one change
//! notification: only the changed entry is re-rendered, derived artifacts are
//! rebuilt in full, and other output units are rewritten only when stats
//! injection makes their markup differ from what was rendered.
//!
//! Events must be applied one at a time.

use std::collections::HashMap;
use std::sync::Arc;

use quire_renderer::{ArtifactSink, MarkdownRenderer};
use quire_storage::{SITE_CONFIG, Storage, StorageError, StorageEvent, StorageEventKind};
use serde::Serialize;

use crate::components::ComponentRegistry;
use crate::entry::{Document, Entry, EntryEnv, EntryError};
use crate::materialize::{MaterializeError, Unit, materialize};
use crate::nav::{NavError, RawSiteConfig, SiteConfig, resolve_nav};
use crate::pathname::Pathname;
use crate::routes::{RouteError, build_routes};
use crate::search::build_search;
use crate::stats::Stats;
use crate::time::TimeSource;

/// Output file holding the resolved site configuration.
pub const CONFIG_FILE: &str = "config.json";
/// Output file holding the route table.
pub const ROUTES_FILE: &str = "routes.json";
/// Output file holding the search bundle.
pub const SEARCH_FILE: &str = "search.json";

/// Error building the site.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("invalid {SITE_CONFIG}: {0}")]
    SiteConfig(#[source] serde_yaml::Error),
    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output unit that could not be materialized.
#[derive(Debug)]
pub struct EmitFailure {
    pub pathname: String,
    pub error: MaterializeError,
}

/// Outcome of an emission pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Pathnames whose output unit was written.
    pub emitted: Vec<String>,
    /// Units skipped because an await failed.
    pub failures: Vec<EmitFailure>,
}

/// Which output units an emission pass writes.
#[derive(Debug, Clone, Copy)]
enum Emit<'a> {
    All,
    /// The changed entry, plus entries affected by stats injection.
    Target(&'a str),
    /// Only entries affected by stats injection.
    Injected,
}

impl Emit<'_> {
    fn includes(self, pathname: &str) -> bool {
        match self {
            Self::All => true,
            Self::Target(target) => target == pathname,
            Self::Injected => false,
        }
    }
}

/// A documentation site and its collaborators.
pub struct Site {
    storage: Arc<dyn Storage>,
    renderer: MarkdownRenderer,
    sink: Arc<dyn ArtifactSink>,
    time: Arc<dyn TimeSource>,
    components: ComponentRegistry,
    entries: Vec<Entry>,
}

impl Site {
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        renderer: MarkdownRenderer,
        sink: Arc<dyn ArtifactSink>,
        time: Arc<dyn TimeSource>,
        components: ComponentRegistry,
    ) -> Self {
        Self {
            storage,
            renderer,
            sink,
            time,
            components,
            entries: Vec::new(),
        }
    }

    /// Entries in pathname order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, pathname: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.pathname().as_str() == pathname)
    }

    /// Re-enumerate the component directory on the next emission.
    pub fn reset_components(&mut self) {
        self.components.reset();
    }

    /// Scan, render and write everything.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if scanning, rendering, a derived artifact or a
    /// write fails. Await failures are reported per entry in the
    /// [`BuildReport`] instead.
    pub async fn build(&mut self) -> Result<BuildReport, SiteError> {
        let pathnames = self.storage.scan()?;
        self.entries = pathnames
            .iter()
            .filter_map(|p| match Pathname::parse(p) {
                Ok(pathname) => Some(Entry::with_time_source(pathname, self.time.as_ref())),
                Err(e) => {
                    tracing::warn!(path = %p, error = %e, "skipping document");
                    None
                }
            })
            .collect();
        tracing::info!(count = self.entries.len(), "scanned documents");

        let env = EntryEnv {
            storage: self.storage.as_ref(),
            renderer: &self.renderer,
            sink: self.sink.as_ref(),
        };
        for entry in &mut self.entries {
            entry.prepare(env)?;
        }

        self.write_derived()?;
        self.emit(Emit::All).await
    }

    /// Apply one change notification.
    ///
    /// Pathnames outside the document convention are ignored.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub async fn apply(&mut self, event: &StorageEvent) -> Result<BuildReport, SiteError> {
        if event.pathname == SITE_CONFIG {
            self.write_config()?;
            return Ok(BuildReport::default());
        }
        let Ok(pathname) = Pathname::parse(&event.pathname) else {
            tracing::debug!(path = %event.pathname, "ignoring change");
            return Ok(BuildReport::default());
        };

        match event.kind {
            StorageEventKind::Removed => {
                let Some(index) = self.position(&pathname).ok() else {
                    return Ok(BuildReport::default());
                };
                self.entries.remove(index);
                let unit = pathname.post_pathname();
                self.sink
                    .remove(&unit)
                    .map_err(|source| SiteError::Io { path: unit.clone(), source })?;
                tracing::info!(path = %unit, "removed output unit");

                self.write_derived()?;
                self.emit(Emit::Injected).await
            }
            StorageEventKind::Created | StorageEventKind::Modified => {
                let target = pathname.as_str().to_owned();
                let index = match self.position(&pathname) {
                    Ok(index) => index,
                    Err(index) => {
                        let entry = Entry::with_time_source(pathname, self.time.as_ref());
                        self.entries.insert(index, entry);
                        index
                    }
                };

                let env = EntryEnv {
                    storage: self.storage.as_ref(),
                    renderer: &self.renderer,
                    sink: self.sink.as_ref(),
                };
                let entry = &mut self.entries[index];
                entry.reset_cache();
                entry.update_time(self.time.as_ref());
                entry.prepare(env)?;

                self.write_derived()?;
                self.emit(Emit::Target(&target)).await
            }
        }
    }

    fn position(&self, pathname: &Pathname) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|e| e.pathname().as_str().cmp(pathname.as_str()))
    }

    fn documents(&self) -> Vec<Document<'_>> {
        self.entries.iter().filter_map(Entry::document).collect()
    }

    fn write_json(&self, rel: &str, value: &impl Serialize) -> Result<(), SiteError> {
        let json = serde_json::to_string(value)?;
        self.sink
            .write(rel, json.as_bytes())
            .map_err(|source| SiteError::Io {
                path: rel.to_owned(),
                source,
            })?;
        tracing::info!(path = rel, "wrote artifact");
        Ok(())
    }

    fn write_derived(&self) -> Result<(), SiteError> {
        self.write_search()?;
        self.write_config()?;
        self.write_routes()
    }

    fn write_search(&self) -> Result<(), SiteError> {
        self.write_json(SEARCH_FILE, &build_search(&self.documents()))
    }

    fn write_config(&self) -> Result<(), SiteError> {
        let raw = if self.storage.exists(SITE_CONFIG) {
            let content = self.storage.read(SITE_CONFIG)?;
            RawSiteConfig::from_yaml(&content).map_err(SiteError::SiteConfig)?
        } else {
            RawSiteConfig::default()
        };

        let docs = self.documents();
        let titles: HashMap<&str, &str> = docs
            .iter()
            .map(|doc| (doc.entry.pathname().as_str(), doc.title()))
            .collect();
        let config = SiteConfig {
            nav: resolve_nav(&raw.nav, |p| titles.get(p).copied())?,
            icon: raw.icon,
        };
        self.write_json(CONFIG_FILE, &config)
    }

    fn write_routes(&self) -> Result<(), SiteError> {
        let routes = build_routes(&self.documents(), |doc| {
            format!("{}.vue", self.sink.import_path(&doc.entry.pathname().post_stem()))
        })?;
        self.write_json(ROUTES_FILE, &routes)
    }

    async fn emit(&mut self, which: Emit<'_>) -> Result<BuildReport, SiteError> {
        let components = self.components.imports();
        let docs: Vec<Document<'_>> = self.entries.iter().filter_map(Entry::document).collect();
        let stats = Stats::collect(&docs);
        let mut report = BuildReport::default();

        for doc in &docs {
            let entry = doc.entry;
            let pathname = entry.pathname().as_str();
            let html = stats.inject(doc.html);
            if !which.includes(pathname) && html == doc.html {
                continue;
            }

            let unit = Unit {
                components: &components,
                dependencies: entry.dependencies(),
                awaits: entry.awaits(),
                expressions: entry.expressions(),
                html: &html,
            };
            match materialize(unit).await {
                Ok(text) => {
                    let rel = entry.pathname().post_pathname();
                    self.sink
                        .write(&rel, text.as_bytes())
                        .map_err(|source| SiteError::Io {
                            path: rel.clone(),
                            source,
                        })?;
                    tracing::info!(path = %rel, title = doc.title(), "updated");
                    report.emitted.push(pathname.to_owned());
                }
                Err(error) => {
                    tracing::warn!(path = %pathname, error = %error, "skipping output unit");
                    report.failures.push(EmitFailure {
                        pathname: pathname.to_owned(),
                        error,
                    });
                }
            }
        }

        Ok(report)
    }
}
