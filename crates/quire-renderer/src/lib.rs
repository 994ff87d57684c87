//! Markdown to component-markup rendering.
//!
//! Documents are parsed into a token tree of `CommonMark` events plus custom
//! tokens, then rendered by a tree walk into template markup for a
//! single-file component.
//!
//! # Architecture
//!
//! - [`Rule`]/[`RuleSet`]: custom inline and block delimiter syntaxes
//!   (`$math$`, `$$ math $$`, `:icon:`), recognised in a preprocessing pass
//!   before the `CommonMark` parser runs.
//! - [`Slots`]: deferred resources. The walk never inlines files, async
//!   values or script literals; it registers them and writes identifiers.
//! - [`RenderContext`]: the document, its slots and the output [`Mode`],
//!   passed explicitly through every render call.
//! - [`Highlighter`], [`Typesetter`], [`ImageProbe`]: external collaborators.
//!
//! # Example
//!
//! ```
//! use quire_renderer::{MarkdownRenderer, NullSink, Page, RenderContext, Slots};
//!
//! let md = MarkdownRenderer::new();
//! let tokens = md.parse("Inline `code` is hoisted.");
//!
//! let mut slots = Slots::new();
//! let page = Page { pathname: "docs/guide.md", url: "/guide", filename: "guide" };
//! let result = md.render(&tokens, &mut RenderContext::new(page, &mut slots, &NullSink));
//!
//! assert!(result.html.contains("{{expr_0}}"));
//! assert_eq!(slots.expressions()[0].content, "\"code\"");
//! ```

mod attrs;
mod context;
mod fence;
mod html;
mod plugins;
mod preprocess;
mod renderer;
mod rule;
mod slots;
mod text;
mod token;

pub use attrs::Attrs;
pub use context::{
    Figure, Highlighter, ImageProbe, Mode, Page, PlainHighlighter, RenderContext, TocEntry,
    TypesetFailure, Typesetter,
};
pub use html::{escape_html, is_external, json_string, resolve_link};
pub use plugins::FORMULA;
pub use renderer::{MarkdownRenderer, RenderResult};
pub use rule::{RenderFn, Rule, RuleKind, RuleSet, RuleToken, TextFn};
pub use slots::{
    ArtifactSink, Await, AwaitError, AwaitFuture, AwaitTarget, Dependency, Expression, NullSink,
    Slots,
};
pub use token::{Token, parser_options};
