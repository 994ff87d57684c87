//! Block components (`::note`), shorthand components (`:Index`) and their
//! attribute conventions.

use crate::attrs::Attrs;
use crate::context::{Mode, RenderContext};
use crate::renderer::MarkdownRenderer;

/// Flags on `note` and `fold` that collapse into a `type` attribute.
const THEMES: [&str; 5] = ["default", "success", "info", "warning", "danger"];

pub(crate) fn open(
    md: &MarkdownRenderer,
    name: &str,
    attrs: &Attrs,
    ctx: &mut RenderContext<'_>,
) -> String {
    let attrs = adjust(md, name, attrs.clone(), ctx);
    format!("<{name}{}>\n", attrs.to_html())
}

pub(crate) fn close(name: &str) -> String {
    format!("</{name}>\n")
}

pub(crate) fn shorthand(
    md: &MarkdownRenderer,
    name: &str,
    attrs: &Attrs,
    ctx: &mut RenderContext<'_>,
) -> String {
    let mut attrs = adjust(md, name, attrs.clone(), ctx);
    if name == "Index" && attrs.get("target").is_none() {
        attrs.set("target", ctx.page().url);
    }
    format!("<{name}{} />\n", attrs.to_html())
}

fn adjust(md: &MarkdownRenderer, name: &str, mut attrs: Attrs, ctx: &mut RenderContext<'_>) -> Attrs {
    if name == "note" || name == "fold" {
        for theme in THEMES {
            if attrs.get(theme) == Some("true") {
                attrs.remove(theme);
                attrs.set("type", theme);
            }
        }
    }

    if name == "fold" {
        if let Some(title) = attrs.remove("title") {
            let html = ctx.with_mode(Mode::Jsx, |ctx| md.render_inline(&title, ctx));
            let id = ctx.expr(format!("<>{}</>", html.trim()));
            attrs.set(":title", id);
        }
        for flag in ["always", "expand"] {
            if attrs.get(flag) == Some("true") {
                attrs.remove(flag);
                attrs.set(format!(":{flag}"), "true");
            }
        }
    }

    attrs
}
