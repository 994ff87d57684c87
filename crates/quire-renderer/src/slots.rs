//! Deferred resource slots.
//!
//! Rendering never inlines values that need async work, file emission or
//! script-level escaping. It registers them here and writes the returned
//! identifier into the markup instead. Materialization later declares
//! every slot in a fixed order: dependencies, awaits, expressions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::html::resolve_relative_path;

/// Error produced by an await target.
pub type AwaitError = Box<dyn std::error::Error + Send + Sync>;

/// Future produced by an await target, resolving to script code.
pub type AwaitFuture = Pin<Box<dyn Future<Output = Result<String, AwaitError>> + Send>>;

/// Zero-argument async computation producing script code.
pub type AwaitTarget = Arc<dyn Fn() -> AwaitFuture + Send + Sync>;

/// Destination for file content supplied during rendering.
pub trait ArtifactSink: Send + Sync {
    /// Persist `bytes` at `rel`, relative to the output directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write(&self, rel: &str, bytes: &[u8]) -> std::io::Result<()>;

    /// Delete the file at `rel`. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn remove(&self, _rel: &str) -> std::io::Result<()> {
        Ok(())
    }

    /// Import source for a file written at `rel`.
    fn import_path(&self, rel: &str) -> String;
}

/// Sink that discards content. Import paths use the `@cache` alias.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn write(&self, _rel: &str, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }

    fn import_path(&self, rel: &str) -> String {
        format!("@cache/{rel}")
    }
}

/// File imported by the rendered unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    pub src: String,
}

/// Async value bound before the markup.
#[derive(Clone)]
pub struct Await {
    pub id: String,
    pub target: AwaitTarget,
}

impl fmt::Debug for Await {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Await").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Script expression bound before the markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    pub id: String,
    pub content: String,
}

/// The three slot sequences of one document.
///
/// Identifiers are numbered by position within their sequence, so they are
/// unique per document and restart from zero after [`reset`](Self::reset).
/// Sequence lengths at one point of a render, see [`Slots::rewind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlotMark {
    dependencies: usize,
    awaits: usize,
    expressions: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Slots {
    dependencies: Vec<Dependency>,
    awaits: Vec<Await>,
    expressions: Vec<Expression>,
}

impl Slots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist `content` as a new file and import it.
    ///
    /// The file is named `{filename}.{n}.{hash8}{ext}` under `temp/`, where
    /// `hash8` is taken from the SHA-256 of the content so identical content
    /// keeps its name across re-renders. A failed write is logged and the
    /// import is still registered.
    pub fn require(
        &mut self,
        sink: &dyn ArtifactSink,
        filename: &str,
        content: &[u8],
        ext: &str,
    ) -> String {
        let n = self.dependencies.len();
        let digest = hex::encode(Sha256::digest(content));
        let rel = format!("temp/{filename}.{n}.{}{ext}", &digest[..8]);

        if let Err(e) = sink.write(&rel, content) {
            tracing::warn!(path = %rel, error = %e, "failed to write required file");
        }

        let id = format!("temp_{n}");
        self.dependencies.push(Dependency {
            id: id.clone(),
            src: sink.import_path(&rel),
        });
        id
    }

    /// Import an existing file referenced relative to the document.
    ///
    /// `pathname` is the document's project-relative pathname. Every `src`,
    /// including one with a leading `/`, is joined onto the document's
    /// directory; the import source is the normalized project path with a
    /// leading `/`.
    pub fn use_file(&mut self, pathname: &str, src: &str) -> String {
        let dir = pathname.rsplit_once('/').map_or("", |(dir, _)| dir);
        let resolved = resolve_relative_path(src, dir);

        let id = format!("dep_{}", self.dependencies.len());
        self.dependencies.push(Dependency {
            id: id.clone(),
            src: format!("/{resolved}"),
        });
        id
    }

    /// Register an async computation.
    pub fn defer(&mut self, target: AwaitTarget) -> String {
        let id = format!("await_{}", self.awaits.len());
        self.awaits.push(Await {
            id: id.clone(),
            target,
        });
        id
    }

    /// Hoist a script expression.
    pub fn expr(&mut self, content: impl Into<String>) -> String {
        let id = format!("expr_{}", self.expressions.len());
        self.expressions.push(Expression {
            id: id.clone(),
            content: content.into(),
        });
        id
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    #[must_use]
    pub fn awaits(&self) -> &[Await] {
        &self.awaits
    }

    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub(crate) fn mark(&self) -> SlotMark {
        SlotMark {
            dependencies: self.dependencies.len(),
            awaits: self.awaits.len(),
            expressions: self.expressions.len(),
        }
    }

    /// Drop everything registered after `mark`; the next registrations reuse
    /// the dropped identifiers.
    pub(crate) fn rewind(&mut self, mark: SlotMark) {
        self.dependencies.truncate(mark.dependencies);
        self.awaits.truncate(mark.awaits);
        self.expressions.truncate(mark.expressions);
    }

    /// Clear all three sequences.
    pub fn reset(&mut self) {
        self.dependencies.clear();
        self.awaits.clear();
        self.expressions.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ArtifactSink for RecordingSink {
        fn write(&self, rel: &str, bytes: &[u8]) -> std::io::Result<()> {
            self.written
                .lock()
                .unwrap()
                .push((rel.to_owned(), bytes.to_vec()));
            Ok(())
        }

        fn import_path(&self, rel: &str) -> String {
            format!("@out/{rel}")
        }
    }

    fn ready(code: &'static str) -> AwaitTarget {
        Arc::new(move || -> AwaitFuture { Box::pin(async move { Ok(code.to_owned()) }) })
    }

    #[test]
    fn test_identifiers_are_sequential_per_category() {
        let mut slots = Slots::new();

        assert_eq!(slots.require(&NullSink, "a", b"x", ".svg"), "temp_0");
        assert_eq!(slots.use_file("docs/a.md", "b.png"), "dep_1");
        assert_eq!(slots.defer(ready("1")), "await_0");
        assert_eq!(slots.defer(ready("2")), "await_1");
        assert_eq!(slots.expr("1"), "expr_0");
        assert_eq!(slots.expr("2"), "expr_1");
        assert_eq!(slots.expr("3"), "expr_2");
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut slots = Slots::new();
        slots.expr("1");
        slots.defer(ready("1"));
        slots.use_file("docs/a.md", "b.png");

        slots.reset();

        assert!(slots.dependencies().is_empty());
        assert!(slots.awaits().is_empty());
        assert_eq!(slots.expr("again"), "expr_0");
        assert_eq!(slots.use_file("docs/a.md", "b.png"), "dep_0");
    }

    #[test]
    fn test_require_names_file_by_content_hash() {
        let sink = RecordingSink::default();
        let mut slots = Slots::new();

        slots.require(&sink, "avl-tree", b"<svg/>", ".svg");
        slots.reset();
        slots.require(&sink, "avl-tree", b"<svg/>", ".svg");

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].0, written[1].0);
        assert!(written[0].0.starts_with("temp/avl-tree.0."));
        assert!(written[0].0.ends_with(".svg"));
        assert_eq!(written[0].0.len(), "temp/avl-tree.0.".len() + 8 + 4);
        assert_eq!(
            slots.dependencies()[0].src,
            format!("@out/{}", written[0].0)
        );
    }

    #[test]
    fn test_require_different_content_changes_name() {
        let sink = RecordingSink::default();
        let mut slots = Slots::new();

        slots.require(&sink, "a", b"one", ".svg");
        slots.reset();
        slots.require(&sink, "a", b"two", ".svg");

        let written = sink.written.lock().unwrap();
        assert_ne!(written[0].0, written[1].0);
    }

    #[test]
    fn test_use_file_resolves_against_document_dir() {
        let mut slots = Slots::new();

        slots.use_file("docs/cs/ads/avl-tree.md", "./img/rotate.png");
        slots.use_file("docs/cs/ads/avl-tree.md", "../shared/x.png");
        slots.use_file("docs/index.md", "/public/logo.png");
        slots.use_file("docs/cs/index.md", "/../img/a.png");

        let srcs: Vec<_> = slots.dependencies().iter().map(|d| d.src.as_str()).collect();
        assert_eq!(
            srcs,
            vec![
                "/docs/cs/ads/img/rotate.png",
                "/docs/cs/shared/x.png",
                "/docs/public/logo.png",
                "/docs/img/a.png",
            ]
        );
    }

    #[test]
    fn test_rewind_reuses_identifiers() {
        let mut slots = Slots::new();
        slots.expr("1");
        let mark = slots.mark();

        slots.expr("2");
        slots.use_file("docs/a.md", "b.png");
        slots.rewind(mark);

        assert_eq!(slots.mark(), mark);
        assert_eq!(slots.expr("3"), "expr_1");
        assert_eq!(slots.use_file("docs/a.md", "b.png"), "dep_0");
    }

    #[test]
    fn test_expression_content_is_kept_verbatim() {
        let mut slots = Slots::new();
        slots.expr(r#""a \"quoted\" value""#);
        assert_eq!(slots.expressions()[0].content, r#""a \"quoted\" value""#);
    }

    static_assertions::assert_impl_all!(Slots: Send, Sync);
}
