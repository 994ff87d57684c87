//! Markup helpers shared by the renderer and plugins.

use std::sync::LazyLock;

use pulldown_cmark::Alignment;
use regex::Regex;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--.*?-->").expect("valid comment pattern"));

/// Escape text for HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Serialize a string as a JSON string literal, suitable as a script
/// expression.
#[must_use]
pub fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Remove single-line HTML comments.
#[must_use]
pub fn strip_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

/// Whether an image or link target points outside the site.
///
/// Anything with a URL scheme or a protocol-relative `//` prefix is external.
#[must_use]
pub fn is_external(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    url.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Resolve a relative `.md` link to a site URL.
///
/// `base` is the site directory of the linking document (`cs/ads` for
/// `docs/cs/ads/avl-tree.md`). Non-markdown, external and fragment-only
/// links are returned unchanged.
#[must_use]
pub fn resolve_link(url: &str, base: &str) -> String {
    if is_external(url) || url.starts_with('#') {
        return url.to_owned();
    }

    let (path_part, fragment) = match url.find('#') {
        Some(hash_pos) => (&url[..hash_pos], &url[hash_pos..]),
        None => (url, ""),
    };
    if !path_part.ends_with(".md") {
        return url.to_owned();
    }

    let resolved = match path_part.strip_prefix('/') {
        // Absolute links are rooted at the docs directory.
        Some(absolute) => resolve_relative_path(absolute.strip_prefix("docs/").unwrap_or(absolute), ""),
        None => resolve_relative_path(path_part, base),
    };

    let clean = resolved.strip_suffix(".md").unwrap_or(&resolved);
    let clean = if clean == "index" {
        ""
    } else {
        clean.strip_suffix("/index").unwrap_or(clean)
    };
    format!("/{clean}{fragment}")
}

/// Join `relative` onto directory `base`, normalizing `.` and `..`.
///
/// `..` above the root is dropped.
#[must_use]
pub fn resolve_relative_path(relative: &str, base: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();

    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }

    segments.join("/")
}

/// Column alignment tracking for table rendering.
#[derive(Debug, Default)]
pub(crate) struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    pub(crate) fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub(crate) fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub(crate) fn end_head(&mut self) {
        self.in_head = false;
    }

    pub(crate) fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub(crate) fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub(crate) fn is_in_head(&self) -> bool {
        self.in_head
    }

    pub(crate) fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_json_string() {
        assert_eq!(json_string("say \"hi\"\n"), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a<!-- x -->b<!--y-->c"), "abc");
        assert_eq!(strip_comments("a<!--\nmulti\n-->b"), "a<!--\nmulti\n-->b");
    }

    #[test]
    fn test_is_external() {
        assert!(is_external("https://example.com/a.png"));
        assert!(is_external("//cdn.example.com/a.png"));
        assert!(is_external("data:image/png;base64,AAAA"));
        assert!(!is_external("./a.png"));
        assert!(!is_external("images/a.png"));
        assert!(!is_external("/static/a.png"));
    }

    #[test]
    fn test_resolve_link_sibling() {
        assert_eq!(resolve_link("./splay-tree.md", "cs/ads"), "/cs/ads/splay-tree");
        assert_eq!(resolve_link("splay-tree.md#rotate", "cs/ads"), "/cs/ads/splay-tree#rotate");
    }

    #[test]
    fn test_resolve_link_parent_index() {
        assert_eq!(resolve_link("../index.md", "cs/ads"), "/cs");
        assert_eq!(resolve_link("../../index.md", "cs/ads"), "/");
    }

    #[test]
    fn test_resolve_link_absolute() {
        assert_eq!(resolve_link("/docs/cs/index.md", "math"), "/cs");
        assert_eq!(resolve_link("/cs/ads/avl-tree.md", "math"), "/cs/ads/avl-tree");
    }

    #[test]
    fn test_resolve_link_passthrough() {
        assert_eq!(resolve_link("https://a.com/x.md", "cs"), "https://a.com/x.md");
        assert_eq!(resolve_link("#top", "cs"), "#top");
        assert_eq!(resolve_link("./a.png", "cs"), "./a.png");
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(resolve_relative_path("./a/b.png", "cs"), "cs/a/b.png");
        assert_eq!(resolve_relative_path("../../../x", "cs"), "x");
    }
}
