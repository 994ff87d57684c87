//! Fenced code blocks, typeset figures and inline code.

use crate::attrs::Attrs;
use crate::context::{Figure, RenderContext};
use crate::html::{escape_html, json_string};
use crate::renderer::MarkdownRenderer;

/// Alt text for a figure without caption text.
const FIGURE_ALT: &str = "figure";

/// Split a fence info string into language and caption.
pub(crate) fn split_info(info: &str) -> (&str, &str) {
    let info = info.trim();
    match info.split_once(char::is_whitespace) {
        Some((lang, meta)) => (lang, meta.trim()),
        None => (info, ""),
    }
}

pub(crate) fn block(
    md: &MarkdownRenderer,
    info: &str,
    content: &str,
    ctx: &mut RenderContext<'_>,
) -> String {
    let (lang, caption) = split_info(info);

    if let Some(typesetter) = md.typesetter(lang).filter(|_| !lang.is_empty()) {
        match typesetter.typeset(lang, content) {
            Ok(figure) => return self::figure(md, &figure, caption, ctx),
            Err(e) => ctx.warn(format!("failed to typeset `{lang}` block: {e}")),
        }
    }

    let lang = if lang.is_empty() { "plain" } else { lang };
    let highlighted = md.highlighter().highlight(lang, content);
    let id = ctx.expr(json_string(&highlighted));
    format!(
        "<BlockCode lang=\"{}\" {}></BlockCode>\n",
        escape_html(lang),
        ctx.mode().bind("html", &id)
    )
}

fn figure(
    md: &MarkdownRenderer,
    figure: &Figure,
    caption: &str,
    ctx: &mut RenderContext<'_>,
) -> String {
    let caption_tokens = md.parse_inline(caption);
    let caption_html = md.render_fragment(&caption_tokens, ctx);
    let alt = md.text(&caption_tokens);
    let alt = if alt.trim().is_empty() { FIGURE_ALT } else { alt.trim() };

    let alt_id = ctx.expr(json_string(alt));
    let src_id = ctx.require(&figure.bytes, &figure.ext);
    let mode = ctx.mode();
    format!(
        "<ImageCaptioned {} {}>{caption_html}</ImageCaptioned>\n",
        mode.bind("alt", &alt_id),
        mode.bind("src", &src_id)
    )
}

/// Inline code, hoisted so braces and quotes never reach the template.
pub(crate) fn inline(code: &str, ctx: &mut RenderContext<'_>) -> String {
    let id = ctx.expr(json_string(code));
    format!(
        r#"<code class="inline-code">{}</code>"#,
        ctx.mode().interpolate(&id)
    )
}

/// Inline code tagged `{lang=...}` or `{.language-...}`.
pub(crate) fn tagged_inline(md: &MarkdownRenderer, code: &str, attrs: &Attrs) -> String {
    let lang = attrs
        .get("lang")
        .or_else(|| attrs.classes().find_map(|c| c.strip_prefix("language-")))
        .unwrap_or("plain");
    md.highlighter().highlight(lang, code)
}
