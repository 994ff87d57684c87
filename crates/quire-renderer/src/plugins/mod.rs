//! Special-cased node renderers.
//!
//! Code blocks, headings and images are handled structurally by the tree
//! walk. Math and icons are ordinary rules registered on every renderer.

pub(crate) mod code;
pub(crate) mod component;
pub(crate) mod heading;
pub(crate) mod icon;
pub(crate) mod image;
pub(crate) mod math;

use crate::rule::Rule;

/// Marker that stands in for formulas in extracted text.
pub const FORMULA: &str = "[formula]";

/// Rules registered by [`MarkdownRenderer::new`](crate::MarkdownRenderer::new).
pub(crate) fn builtin_rules() -> Vec<Rule> {
    vec![math::inline_rule(), math::block_rule(), icon::rule()]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::{Page, RenderContext};
    use crate::renderer::{MarkdownRenderer, RenderResult};
    use crate::slots::{NullSink, Slots};

    pub(crate) const PAGE: Page<'static> = Page {
        pathname: "docs/cs/ads/avl-tree.md",
        url: "/cs/ads/avl-tree",
        filename: "avl-tree",
    };

    /// Render with a fresh slot set, returning the result and the slots.
    pub(crate) fn render_with(md: &MarkdownRenderer, markdown: &str) -> (RenderResult, Slots) {
        let tokens = md.parse(markdown);
        let mut slots = Slots::new();
        let result = md.render(&tokens, &mut RenderContext::new(PAGE, &mut slots, &NullSink));
        (result, slots)
    }

    pub(crate) fn render(markdown: &str) -> (RenderResult, Slots) {
        render_with(&MarkdownRenderer::new(), markdown)
    }
}
