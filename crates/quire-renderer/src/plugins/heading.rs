//! Headings and the table of contents.

use crate::attrs::Attrs;
use crate::context::{Mode, RenderContext};
use crate::renderer::MarkdownRenderer;
use crate::token::Token;

/// Render a heading and record it in the table of contents.
///
/// # Panics
///
/// Panics on a level-1 heading: the document title comes from front matter.
pub(crate) fn render(
    md: &MarkdownRenderer,
    inner: &[Token],
    level: u8,
    attrs: &Attrs,
    ctx: &mut RenderContext<'_>,
) -> String {
    assert!(
        level != 1,
        "level-1 heading in {}: the title belongs in front matter",
        ctx.page().pathname
    );

    // The title shares the body's slot identifiers.
    let title = ctx.with_rewind(|ctx| {
        ctx.with_mode(Mode::Jsx, |ctx| md.render_fragment(inner, ctx))
    });
    let hash = ctx.push_toc(level, title.trim().to_owned());
    let body = md.render_fragment(inner, ctx);
    format!(
        "<Heading :level=\"{level}\" :id=\"{hash}\"{}>{body}</Heading>\n",
        attrs.to_html()
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::context::TocEntry;
    use crate::plugins::test_support::render;

    #[test]
    fn test_heading_markup_and_toc() {
        let (result, _) = render("## Rotations\n\n### Left *rotation*\n");
        assert_eq!(
            result.html,
            "<Heading :level=\"2\" :id=\"1\">Rotations</Heading>\n\
             <Heading :level=\"3\" :id=\"2\">Left <em>rotation</em></Heading>\n"
        );
        assert_eq!(
            result.toc[1],
            TocEntry {
                level: 3,
                title: "Left <em>rotation</em>".to_owned(),
                hash: "2".to_owned(),
            }
        );
    }

    #[test]
    fn test_toc_title_uses_jsx_bindings() {
        let (result, slots) = render("## Call `f()`\n");
        assert_eq!(result.toc[0].title, r#"Call <code class="inline-code">{expr_0}</code>"#);
        assert!(result.html.contains(r#"<code class="inline-code">{{expr_0}}</code>"#));
        assert_eq!(slots.expressions().len(), 1);
    }

    #[test]
    fn test_heading_image_registers_once() {
        let (result, slots) = render("## Logo ![tree](img/a.png)

## Next `x`
");
        assert_eq!(slots.dependencies().len(), 1);
        assert!(result.toc[0].title.contains("dep_0"));
        assert!(result.html.contains("dep_0"));
        assert_eq!(result.toc[1].title, r#"Next <code class="inline-code">{expr_1}</code>"#);
    }

    #[test]
    fn test_heading_attributes() {
        let (result, _) = render("## Setup {#setup .wide}\n");
        assert_eq!(
            result.html,
            "<Heading :level=\"2\" :id=\"1\" id=\"setup\" class=\"wide\">Setup</Heading>\n"
        );
    }

    #[test]
    #[should_panic(expected = "level-1 heading in docs/cs/ads/avl-tree.md")]
    fn test_level_one_panics() {
        let _ = render("# Title\n");
    }
}
