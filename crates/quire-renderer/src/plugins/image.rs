//! Images with captions.

use std::fmt::Write;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::html::{escape_html, is_external, json_string};
use crate::renderer::MarkdownRenderer;
use crate::token::Token;

/// Render `![caption](src "title")`.
///
/// Local sources become dependencies; external ones stay verbatim and, with
/// an image probe configured, get their size resolved before the markup.
pub(crate) fn render(
    md: &MarkdownRenderer,
    src: &str,
    title: &str,
    caption: &[Token],
    ctx: &mut RenderContext<'_>,
) -> String {
    let caption_html = md.render_fragment(caption, ctx);
    let alt = md.text(caption);
    let alt_id = ctx.expr(json_string(&alt));
    let mode = ctx.mode();

    let mut out = format!("<ImageCaptioned {}", mode.bind("alt", &alt_id));
    if is_external(src) {
        write!(out, r#" src="{}""#, escape_html(src)).unwrap();
        if let Some(probe) = md.image_probe() {
            let probe = Arc::clone(probe);
            let url = src.to_owned();
            let id = ctx.defer(Arc::new(move || probe.measure(url.clone())));
            write!(out, " {}", mode.bind("size", &id)).unwrap();
        }
    } else {
        let dep = ctx.use_file(src);
        write!(out, " {}", mode.bind("src", &dep)).unwrap();
    }
    if !title.is_empty() {
        write!(out, r#" title="{}""#, escape_html(title)).unwrap();
    }
    write!(out, ">{caption_html}</ImageCaptioned>").unwrap();
    out
}
