//! Explicit render environment and external collaborators.

use crate::html::escape_html;
use crate::slots::{ArtifactSink, AwaitFuture, AwaitTarget, Slots};

/// Output syntax for bindings inside the markup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Template attributes: `:src="dep_0"`, text `{{expr_0}}`.
    #[default]
    Template,
    /// JSX attributes: `src={dep_0}`, text `{expr_0}`.
    Jsx,
}

impl Mode {
    /// Attribute bound to a script identifier.
    #[must_use]
    pub fn bind(self, name: &str, id: &str) -> String {
        match self {
            Self::Template => format!(r#":{name}="{id}""#),
            Self::Jsx => format!("{name}={{{id}}}"),
        }
    }

    /// Text interpolation of a script identifier.
    #[must_use]
    pub fn interpolate(self, id: &str) -> String {
        match self {
            Self::Template => format!("{{{{{id}}}}}"),
            Self::Jsx => format!("{{{id}}}"),
        }
    }
}

/// Table of contents entry recorded while rendering a heading.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TocEntry {
    pub level: u8,
    /// Title rendered in JSX mode.
    pub title: String,
    /// Anchor: the 1-based position of the heading.
    pub hash: String,
}

/// Syntax highlighting service.
pub trait Highlighter: Send + Sync {
    /// Highlight a code block. Returns `<code ...>...</code>` markup
    /// without a surrounding `<pre>`.
    fn highlight(&self, lang: &str, code: &str) -> String;
}

/// Highlighter that only escapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, lang: &str, code: &str) -> String {
        format!(
            r#"<code class="language-{}">{}</code>"#,
            escape_html(lang),
            escape_html(code)
        )
    }
}

/// Error reported by a typesetter.
pub type TypesetFailure = Box<dyn std::error::Error + Send + Sync>;

/// Compiled figure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Figure {
    pub bytes: Vec<u8>,
    /// File extension including the dot (`.svg`).
    pub ext: String,
}

/// Compiles fenced sources of special languages into images.
pub trait Typesetter: Send + Sync {
    /// Whether this typesetter handles `lang`.
    fn supports(&self, lang: &str) -> bool;

    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// Returns the compiler or transport failure.
    fn typeset(&self, lang: &str, source: &str) -> Result<Figure, TypesetFailure>;
}

/// Looks up remote image dimensions.
pub trait ImageProbe: Send + Sync {
    /// Future resolving to `{"width":W,"height":H}` or `null`.
    fn measure(&self, url: String) -> AwaitFuture;
}

/// The document being rendered.
#[derive(Clone, Copy, Debug)]
pub struct Page<'a> {
    pub pathname: &'a str,
    pub url: &'a str,
    /// Basename of the url, used to name required files.
    pub filename: &'a str,
}

impl Page<'_> {
    /// Site directory of the document, for relative link resolution.
    #[must_use]
    pub fn link_base(&self) -> &str {
        let dir = self.pathname.rsplit_once('/').map_or("", |(dir, _)| dir);
        dir.strip_prefix("docs").map_or(dir, |d| d.trim_start_matches('/'))
    }
}

/// Environment threaded through every render call.
///
/// Holds the document, its slot sequences and the output mode. Headings
/// append to the table of contents and plugins report recoverable problems
/// as warnings.
pub struct RenderContext<'a> {
    page: Page<'a>,
    slots: &'a mut Slots,
    sink: &'a dyn ArtifactSink,
    mode: Mode,
    toc: Vec<TocEntry>,
    warnings: Vec<String>,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn new(page: Page<'a>, slots: &'a mut Slots, sink: &'a dyn ArtifactSink) -> Self {
        Self {
            page,
            slots,
            sink,
            mode: Mode::Template,
            toc: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn page(&self) -> Page<'a> {
        self.page
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run `f` with a different mode, restoring the current one afterwards.
    pub fn with_mode<R>(&mut self, mode: Mode, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.mode, mode);
        let result = f(self);
        self.mode = saved;
        result
    }

    /// Run `f`, then forget the slots and warnings it registered. Rendering
    /// the same tokens afterwards allocates the same identifiers again.
    pub(crate) fn with_rewind<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let mark = self.slots.mark();
        let warnings = self.warnings.len();
        let result = f(self);
        self.slots.rewind(mark);
        self.warnings.truncate(warnings);
        result
    }

    /// See [`Slots::require`].
    pub fn require(&mut self, content: &[u8], ext: &str) -> String {
        self.slots
            .require(self.sink, self.page.filename, content, ext)
    }

    /// See [`Slots::use_file`].
    pub fn use_file(&mut self, src: &str) -> String {
        self.slots.use_file(self.page.pathname, src)
    }

    /// See [`Slots::defer`].
    pub fn defer(&mut self, target: AwaitTarget) -> String {
        self.slots.defer(target)
    }

    /// See [`Slots::expr`].
    pub fn expr(&mut self, content: impl Into<String>) -> String {
        self.slots.expr(content)
    }

    /// Append a heading and return its anchor.
    pub(crate) fn push_toc(&mut self, level: u8, title: String) -> String {
        let hash = (self.toc.len() + 1).to_string();
        self.toc.push(TocEntry {
            level,
            title,
            hash: hash.clone(),
        });
        hash
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %self.page.pathname, "{message}");
        self.warnings.push(message);
    }

    pub(crate) fn take_toc(&mut self) -> Vec<TocEntry> {
        std::mem::take(&mut self.toc)
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}
