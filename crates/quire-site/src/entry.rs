//! Document entries.
//!
//! An [`Entry`] owns one source file's identity, timestamps, deferred
//! resource slots and a lazily filled cache:
//!
//! ```text
//! raw -> front matter + markdown -> tokens -> rendered (html, toc) -> text
//! ```
//!
//! Each stage is computed on first access from the stage before it.
//! [`Entry::reset_cache`] empties every stage and the slots at once; there is
//! no partial invalidation.

use quire_renderer::{
    ArtifactSink, Await, AwaitTarget, Dependency, Expression, MarkdownRenderer, Page,
    RenderContext, RenderResult, Slots, TocEntry, Token,
};
use quire_storage::{Storage, StorageError};

use crate::front_matter::{self, FrontMatter, FrontMatterError};
use crate::pathname::{EntryKind, Pathname};
use crate::time::{EntryTime, TimeSource};

/// Collaborators needed to fill an entry's cache.
#[derive(Clone, Copy)]
pub struct EntryEnv<'a> {
    pub storage: &'a dyn Storage,
    pub renderer: &'a MarkdownRenderer,
    pub sink: &'a dyn ArtifactSink,
}

/// Error filling an entry's cache.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("failed to read {pathname}: {source}")]
    Storage {
        pathname: String,
        #[source]
        source: StorageError,
    },
    #[error("{pathname}: {source}")]
    FrontMatter {
        pathname: String,
        #[source]
        source: FrontMatterError,
    },
}

#[derive(Debug, Default)]
struct EntryCache {
    raw: Option<String>,
    parsed: Option<(FrontMatter, String)>,
    tokens: Option<Vec<Token>>,
    rendered: Option<RenderResult>,
    text: Option<String>,
}

/// One markdown document.
#[derive(Debug)]
pub struct Entry {
    pathname: Pathname,
    url: String,
    filename: String,
    time: EntryTime,
    slots: Slots,
    cache: EntryCache,
}

/// Read-only view of a fully computed entry.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    pub entry: &'a Entry,
    pub front_matter: &'a FrontMatter,
    pub html: &'a str,
    pub toc: &'a [TocEntry],
    pub text: &'a str,
}

impl Document<'_> {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.front_matter.title
    }
}

impl Entry {
    #[must_use]
    pub fn new(pathname: Pathname, time: EntryTime) -> Self {
        Self {
            url: pathname.url(),
            filename: pathname.filename(),
            pathname,
            time,
            slots: Slots::new(),
            cache: EntryCache::default(),
        }
    }

    /// Create an entry with timestamps from `source`.
    #[must_use]
    pub fn with_time_source(pathname: Pathname, source: &dyn TimeSource) -> Self {
        let time = source.time_of(pathname.as_str());
        Self::new(pathname, time)
    }

    #[must_use]
    pub fn pathname(&self) -> &Pathname {
        &self.pathname
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.pathname.kind()
    }

    #[must_use]
    pub fn category(&self) -> String {
        self.pathname.category()
    }

    #[must_use]
    pub fn back_urls(&self) -> Vec<String> {
        self.pathname.back_urls()
    }

    #[must_use]
    pub fn time(&self) -> &EntryTime {
        &self.time
    }

    /// Refresh timestamps. Content invalidation leaves them alone.
    pub fn update_time(&mut self, source: &dyn TimeSource) {
        self.time = source.time_of(self.pathname.as_str());
    }

    /// Forget every cached stage and all slots.
    pub fn reset_cache(&mut self) {
        self.cache = EntryCache::default();
        self.slots.reset();
    }

    #[must_use]
    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        self.slots.dependencies()
    }

    #[must_use]
    pub fn awaits(&self) -> &[Await] {
        self.slots.awaits()
    }

    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        self.slots.expressions()
    }

    /// Persist `content` as a new file and register it as a dependency.
    pub fn require(&mut self, sink: &dyn ArtifactSink, content: &[u8], ext: &str) -> String {
        self.slots.require(sink, &self.filename, content, ext)
    }

    /// Register a file relative to this entry as a dependency.
    pub fn use_file(&mut self, src: &str) -> String {
        self.slots.use_file(self.pathname.as_str(), src)
    }

    /// Register an async computation.
    pub fn defer(&mut self, target: AwaitTarget) -> String {
        self.slots.defer(target)
    }

    /// Hoist a script expression.
    pub fn expr(&mut self, content: impl Into<String>) -> String {
        self.slots.expr(content)
    }

    /// Raw file content.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::Storage`] if the file cannot be read.
    pub fn raw(&mut self, storage: &dyn Storage) -> Result<&str, EntryError> {
        let raw = match self.cache.raw.take() {
            Some(raw) => raw,
            None => storage
                .read(self.pathname.as_str())
                .map_err(|source| EntryError::Storage {
                    pathname: self.pathname.to_string(),
                    source,
                })?,
        };
        Ok(self.cache.raw.insert(raw))
    }

    fn parsed(&mut self, storage: &dyn Storage) -> Result<&(FrontMatter, String), EntryError> {
        let parsed = match self.cache.parsed.take() {
            Some(parsed) => parsed,
            None => {
                let pathname = self.pathname.to_string();
                let raw = self.raw(storage)?;
                let (fm, body) = front_matter::parse(raw)
                    .map_err(|source| EntryError::FrontMatter { pathname, source })?;
                (fm, body.to_owned())
            }
        };
        Ok(self.cache.parsed.insert(parsed))
    }

    /// Parsed front matter.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] if the file cannot be read or its front matter
    /// is invalid.
    pub fn front_matter(&mut self, storage: &dyn Storage) -> Result<&FrontMatter, EntryError> {
        Ok(&self.parsed(storage)?.0)
    }

    /// Markdown body after the front matter.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn markdown(&mut self, storage: &dyn Storage) -> Result<&str, EntryError> {
        Ok(&self.parsed(storage)?.1)
    }

    /// Token tree of the markdown body.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn tokens(&mut self, env: EntryEnv<'_>) -> Result<&[Token], EntryError> {
        let tokens = match self.cache.tokens.take() {
            Some(tokens) => tokens,
            None => {
                let markdown = self.markdown(env.storage)?;
                env.renderer.parse(markdown)
            }
        };
        Ok(self.cache.tokens.insert(tokens))
    }

    /// Rendered markup and table of contents. Rendering fills the slots.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn rendered(&mut self, env: EntryEnv<'_>) -> Result<&RenderResult, EntryError> {
        let rendered = match self.cache.rendered.take() {
            Some(rendered) => rendered,
            None => {
                self.tokens(env)?;
                let tokens = self.cache.tokens.as_deref().unwrap_or_default();
                let page = Page {
                    pathname: self.pathname.as_str(),
                    url: &self.url,
                    filename: &self.filename,
                };
                let mut ctx = RenderContext::new(page, &mut self.slots, env.sink);
                let result = env.renderer.render(tokens, &mut ctx);
                for warning in &result.warnings {
                    tracing::warn!(path = %self.pathname, "{warning}");
                }
                tracing::debug!(path = %self.pathname, "rendered entry");
                result
            }
        };
        Ok(self.cache.rendered.insert(rendered))
    }

    /// Rendered markup.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn html(&mut self, env: EntryEnv<'_>) -> Result<&str, EntryError> {
        Ok(&self.rendered(env)?.html)
    }

    /// Table of contents, a side effect of rendering.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn toc(&mut self, env: EntryEnv<'_>) -> Result<&[TocEntry], EntryError> {
        Ok(&self.rendered(env)?.toc)
    }

    /// Plain text for the search index.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn text(&mut self, env: EntryEnv<'_>) -> Result<&str, EntryError> {
        let text = match self.cache.text.take() {
            Some(text) => text,
            None => {
                self.rendered(env)?;
                env.renderer
                    .text(self.cache.tokens.as_deref().unwrap_or_default())
            }
        };
        Ok(self.cache.text.insert(text))
    }

    /// Fill the whole cache.
    ///
    /// # Errors
    ///
    /// See [`front_matter`](Self::front_matter).
    pub fn prepare(&mut self, env: EntryEnv<'_>) -> Result<(), EntryError> {
        self.text(env).map(|_| ())
    }

    /// View of the cached stages, once [`prepare`](Self::prepare) succeeded.
    #[must_use]
    pub fn document(&self) -> Option<Document<'_>> {
        let (front_matter, _) = self.cache.parsed.as_ref()?;
        let rendered = self.cache.rendered.as_ref()?;
        let text = self.cache.text.as_deref()?;
        Some(Document {
            entry: self,
            front_matter,
            html: &rendered.html,
            toc: &rendered.toc,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use quire_renderer::{AwaitFuture, NullSink};
    use quire_storage::MockStorage;

    use super::*;

    const AVL: &str = "docs/cs/ads/avl-tree.md";

    fn time() -> EntryTime {
        EntryTime {
            created: "2024-09-11T13:51:55+08:00".to_owned(),
            updated: "2024-09-19T17:10:17+08:00".to_owned(),
        }
    }

    fn entry(pathname: &str) -> Entry {
        Entry::new(Pathname::parse(pathname).unwrap(), time())
    }

    fn storage(content: &str) -> MockStorage {
        MockStorage::new().with_file(AVL, content)
    }

    fn env<'a>(storage: &'a MockStorage, renderer: &'a MarkdownRenderer) -> EntryEnv<'a> {
        EntryEnv {
            storage,
            renderer,
            sink: &NullSink,
        }
    }

    #[test]
    fn test_identity_is_derived_from_pathname() {
        let e = entry(AVL);
        assert_eq!(e.url(), "/cs/ads/avl-tree");
        assert_eq!(e.filename(), "avl-tree");
        assert_eq!(e.kind(), EntryKind::Post);
        assert_eq!(e.category(), "cs");
        assert_eq!(e.back_urls(), vec!["/", "/cs", "/cs/ads"]);
    }

    #[test]
    fn test_lazy_chain() {
        let storage = storage("---\ntitle: AVL Tree\n---\n## Rotation\n\nLeft `rotate`.\n");
        let renderer = MarkdownRenderer::new();
        let mut e = entry(AVL);

        assert!(e.document().is_none());
        e.prepare(env(&storage, &renderer)).unwrap();

        let doc = e.document().unwrap();
        assert_eq!(doc.title(), "AVL Tree");
        assert_eq!(doc.toc.len(), 1);
        assert_eq!(doc.toc[0].title, "Rotation");
        assert!(doc.html.contains(r#"<Heading :level="2" :id="1">Rotation</Heading>"#));
        assert_eq!(doc.text, "Rotation\nLeft rotate.");
        assert_eq!(e.expressions().len(), 1);
    }

    #[test]
    fn test_repeated_reads_do_not_recompute() {
        let storage = storage("---\ntitle: T\n---\nUse `a` and `b`.\n");
        let renderer = MarkdownRenderer::new();
        let mut e = entry(AVL);

        let first = e.html(env(&storage, &renderer)).unwrap().to_owned();
        // Storage changes are invisible until the cache is reset.
        storage.write(AVL, "---\ntitle: T\n---\nchanged\n");
        let second = e.html(env(&storage, &renderer)).unwrap().to_owned();

        assert_eq!(first, second);
        assert_eq!(e.expressions().len(), 2);
    }

    #[test]
    fn test_text_is_idempotent() {
        let storage = storage("---\ntitle: T\n---\nEnergy $E=mc^2$.\n\n- a\n- b\n");
        let renderer = MarkdownRenderer::new();
        let mut e = entry(AVL);

        let first = e.text(env(&storage, &renderer)).unwrap().to_owned();
        let second = e.text(env(&storage, &renderer)).unwrap().to_owned();

        assert_eq!(first, second);
        assert_eq!(renderer.text(e.tokens(env(&storage, &renderer)).unwrap()), first);
    }

    #[test]
    fn test_reset_cache_clears_chain_and_slots_but_keeps_time() {
        let storage = storage("---\ntitle: Old\n---\n`x`\n");
        let renderer = MarkdownRenderer::new();
        let mut e = entry(AVL);
        e.prepare(env(&storage, &renderer)).unwrap();
        assert_eq!(e.expressions().len(), 1);

        storage.write(AVL, "---\ntitle: New\n---\nplain\n");
        e.reset_cache();

        assert!(e.document().is_none());
        assert!(e.expressions().is_empty());
        assert_eq!(e.time(), &time());

        e.prepare(env(&storage, &renderer)).unwrap();
        assert_eq!(e.document().unwrap().title(), "New");
        assert!(e.expressions().is_empty());
    }

    #[test]
    fn test_identifier_allocation_restarts_after_reset() {
        let mut e = entry(AVL);
        let target: AwaitTarget =
            Arc::new(|| -> AwaitFuture { Box::pin(async { Ok("null".to_owned()) }) });

        assert_eq!(e.require(&NullSink, b"<svg/>", ".svg"), "temp_0");
        assert_eq!(e.use_file("a.png"), "dep_1");
        assert_eq!(e.defer(target.clone()), "await_0");
        assert_eq!(e.defer(target.clone()), "await_1");
        assert_eq!(e.expr("1"), "expr_0");
        assert_eq!(e.expr("2"), "expr_1");
        assert_eq!(e.dependencies()[1].src, "/docs/cs/ads/a.png");

        e.reset_cache();

        assert_eq!(e.use_file("a.png"), "dep_0");
        assert_eq!(e.defer(target), "await_0");
        assert_eq!(e.expr("3"), "expr_0");
    }

    #[test]
    fn test_require_name_is_stable_for_identical_content() {
        let mut e = entry(AVL);
        e.require(&NullSink, b"<svg>1</svg>", ".svg");
        let before = e.dependencies()[0].src.clone();

        e.reset_cache();
        e.require(&NullSink, b"<svg>1</svg>", ".svg");

        assert_eq!(e.dependencies()[0].src, before);
        assert!(before.starts_with("@cache/temp/avl-tree.0."));
        assert!(before.ends_with(".svg"));
    }

    #[test]
    fn test_front_matter_error_names_pathname() {
        let storage = storage("no front matter\n");
        let renderer = MarkdownRenderer::new();
        let mut e = entry(AVL);

        let err = e.prepare(env(&storage, &renderer)).unwrap_err();

        assert!(matches!(err, EntryError::FrontMatter { .. }));
        assert!(err.to_string().starts_with(AVL));
        assert!(e.document().is_none());
    }

    #[test]
    fn test_missing_file_is_storage_error() {
        let storage = MockStorage::new();
        let mut e = entry(AVL);
        assert!(matches!(e.raw(&storage), Err(EntryError::Storage { .. })));
    }

    #[test]
    fn test_update_time() {
        struct Fixed;
        impl TimeSource for Fixed {
            fn time_of(&self, _pathname: &str) -> EntryTime {
                EntryTime {
                    created: "2020-01-01T00:00:00Z".to_owned(),
                    updated: "2021-01-01T00:00:00Z".to_owned(),
                }
            }
        }

        let mut e = entry(AVL);
        e.update_time(&Fixed);
        assert_eq!(e.time().updated, "2021-01-01T00:00:00Z");
    }

    static_assertions::assert_impl_all!(Entry: Send);
}
