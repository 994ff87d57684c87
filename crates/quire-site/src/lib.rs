//! Document entries, derived artifacts and incremental rebuilds.
//!
//! This crate provides:
//! - [`Entry`]: one markdown document with a lazily filled render cache
//! - [`Site`]: the entry list, derived artifacts (navigation, routes,
//!   search index) and output unit emission
//! - [`Searcher`]: query-time matcher over a serialized [`SearchBundle`]
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use quire_renderer::MarkdownRenderer;
//! use quire_site::{ComponentRegistry, OutputSink, OverrideTable, Site, StaticTimeSource};
//! use quire_storage::FsStorage;
//!
//! let mut site = Site::new(
//!     Arc::new(FsStorage::new(PathBuf::from("."))),
//!     MarkdownRenderer::new(),
//!     Arc::new(OutputSink::new(PathBuf::from("cache"), "@cache")),
//!     Arc::new(StaticTimeSource::new(OverrideTable::default())),
//!     ComponentRegistry::new(PathBuf::from("src/components/md"), "@/components/md"),
//! );
//!
//! let report = site.build().await?;
//! println!("{} units written", report.emitted.len());
//! # Ok(())
//! # }
//! ```

mod components;
mod entry;
mod front_matter;
mod materialize;
mod nav;
mod pathname;
mod routes;
mod search;
mod site;
mod sink;
mod stats;
mod time;

pub use components::ComponentRegistry;
pub use entry::{Document, Entry, EntryEnv, EntryError};
pub use front_matter::{FrontMatter, FrontMatterError};
pub use materialize::{MaterializeError, Unit, materialize};
pub use nav::{NavError, NavNode, RawNavNode, RawSiteConfig, SiteConfig, resolve_nav};
pub use pathname::{EntryKind, Pathname, PathnameError};
pub use routes::{BreadcrumbItem, NOT_FOUND_PATH, RouteError, RouteMeta, RouteRecord, build_routes};
pub use search::{
    FieldMatch, SEARCH_KEYS, SEARCH_THRESHOLD, SearchBundle, SearchHit, SearchOptions,
    SearchTarget, Searcher, build_search,
};
pub use site::{BuildReport, CONFIG_FILE, EmitFailure, ROUTES_FILE, SEARCH_FILE, Site, SiteError};
pub use sink::{MemorySink, OutputSink};
pub use stats::{Stats, count_words};
pub use time::{
    EntryTime, GitTimeSource, OverrideTable, StaticTimeSource, TimeError, TimeOverride,
    TimeSource, parse_cutoff,
};
