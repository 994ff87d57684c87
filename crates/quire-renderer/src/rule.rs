//! Custom delimiter syntaxes.
//!
//! A [`Rule`] names a literal marker and how to render what it delimits.
//! Inline rules wrap a span inside a paragraph (`$x^2$`); block rules wrap
//! whole lines (`$$ ... $$`). Matching never fails: a marker that cannot
//! open or close stays literal text and scanning advances past it.

use std::fmt;

use crate::attrs::Attrs;
use crate::context::RenderContext;

/// Renders a matched token.
pub type RenderFn = dyn Fn(&RuleToken, &mut RenderContext<'_>) -> String + Send + Sync;

/// Plain-text contribution of a matched token.
pub type TextFn = dyn Fn(&RuleToken) -> Option<String> + Send + Sync;

/// Where a rule applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    /// Span within a line.
    Inline,
    /// Region of whole lines.
    Block,
}

/// A registered custom syntax.
pub struct Rule {
    name: String,
    marker: String,
    kind: RuleKind,
    render: Box<RenderFn>,
    text: Option<Box<TextFn>>,
}

impl Rule {
    /// Inline rule delimited by `marker` on both sides.
    ///
    /// # Panics
    ///
    /// Panics if `marker` is empty.
    pub fn inline<F>(name: impl Into<String>, marker: impl Into<String>, render: F) -> Self
    where
        F: Fn(&RuleToken, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(name.into(), marker.into(), RuleKind::Inline, Box::new(render))
    }

    /// Block rule opened by a line starting with `marker` and closed by a
    /// line ending with it.
    ///
    /// # Panics
    ///
    /// Panics if `marker` is empty.
    pub fn block<F>(name: impl Into<String>, marker: impl Into<String>, render: F) -> Self
    where
        F: Fn(&RuleToken, &mut RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(name.into(), marker.into(), RuleKind::Block, Box::new(render))
    }

    fn new(name: String, marker: String, kind: RuleKind, render: Box<RenderFn>) -> Self {
        assert!(!marker.is_empty(), "rule `{name}` has an empty marker");
        Self {
            name,
            marker,
            kind,
            render,
            text: None,
        }
    }

    /// Set the plain-text contribution. Without one the token contributes
    /// nothing to extracted text.
    #[must_use]
    pub fn with_text<F>(mut self, text: F) -> Self
    where
        F: Fn(&RuleToken) -> Option<String> + Send + Sync + 'static,
    {
        self.text = Some(Box::new(text));
        self
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delimiter literal.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Inline or block.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub(crate) fn render(&self, token: &RuleToken, ctx: &mut RenderContext<'_>) -> String {
        (self.render)(token, ctx)
    }

    pub(crate) fn text(&self, token: &RuleToken) -> Option<String> {
        self.text.as_ref().and_then(|f| f(token))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A matched region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleToken {
    /// Name of the rule that matched.
    pub rule: String,
    /// Raw content between the markers.
    pub content: String,
    /// Trailing `{...}` attribute group (inline rules only).
    pub attrs: Attrs,
}

/// Registered rules, looked up by name at render time.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, replacing any rule with the same name.
    pub fn register(&mut self, rule: Rule) {
        self.rules.retain(|r| r.name != rule.name);
        self.rules.push(rule);
        // Longer markers first so `$$` wins over `$` at the same position.
        self.rules
            .sort_by(|a, b| b.marker.len().cmp(&a.marker.len()));
    }

    /// Rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub(crate) fn of_kind(&self, kind: RuleKind) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.kind == kind)
    }

    /// Whether any inline marker starts with `c`.
    pub(crate) fn is_inline_start(&self, c: char) -> bool {
        self.of_kind(RuleKind::Inline)
            .any(|r| r.marker.starts_with(c))
    }
}

/// Outcome of trying an inline rule at a marker position.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InlineMatch {
    /// Emit this many bytes as literal text and continue after them.
    Literal(usize),
    /// Content spans `content`; the match ends at byte `end`.
    Span {
        content: std::ops::Range<usize>,
        end: usize,
    },
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Try an inline rule whose `marker` occurs at `pos` in `text`.
pub(crate) fn match_inline(text: &str, pos: usize, marker: &str) -> InlineMatch {
    debug_assert!(text[pos..].starts_with(marker));
    let len = marker.len();
    let after = pos + len;

    if text[after..].chars().next().is_some_and(is_space) {
        return InlineMatch::Literal(len);
    }

    let mut start = after;
    let close = loop {
        let Some(found) = text[start..].find(marker).map(|i| start + i) else {
            return InlineMatch::Literal(len);
        };
        let backslashes = text[..found].chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 0 {
            break found;
        }
        start = found + 1;
    };

    if close == after {
        return InlineMatch::Literal(len * 2);
    }

    let prev = text[..close].chars().next_back();
    let next = text[close + len..].chars().next();
    if prev.is_some_and(is_space) || next.is_some_and(|c| c.is_ascii_digit()) {
        return InlineMatch::Literal(len);
    }

    InlineMatch::Span {
        content: after..close,
        end: close + len,
    }
}

/// A matched block region.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct BlockMatch {
    pub content: String,
    /// Index of the first line after the block.
    pub next_line: usize,
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(is_space).len()
}

/// Strip at most `indent` bytes of leading whitespace.
fn dedent(line: &str, indent: usize) -> &str {
    let strip = indent_width(line).min(indent);
    &line[strip..]
}

/// Try a block rule opening at `lines[start]`.
pub(crate) fn match_block(lines: &[&str], start: usize, marker: &str) -> Option<BlockMatch> {
    let line = lines.get(start)?;
    let indent = indent_width(line);
    let first_line = line[indent..].strip_prefix(marker)?;

    let trimmed = first_line.trim();
    if let Some(single) = trimmed.strip_suffix(marker) {
        return Some(BlockMatch {
            content: format!("{single}\n"),
            next_line: start + 1,
        });
    }

    let mut content = String::new();
    if !trimmed.is_empty() {
        content.push_str(first_line);
        content.push('\n');
    }

    let mut next = start + 1;
    let mut last_line = "";
    while next < lines.len() {
        let current = dedent(lines[next], indent);
        next += 1;
        if current.trim().ends_with(marker) {
            if let Some(end) = current.rfind(marker) {
                last_line = &current[..end];
            }
            break;
        }
        content.push_str(current);
        content.push('\n');
    }

    if !last_line.trim().is_empty() {
        content.push_str(last_line);
    }

    Some(BlockMatch {
        content,
        next_line: next,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn span(text: &str, pos: usize, marker: &str) -> Option<String> {
        match match_inline(text, pos, marker) {
            InlineMatch::Span { content, .. } => Some(text[content].to_owned()),
            InlineMatch::Literal(_) => None,
        }
    }

    #[test]
    fn test_inline_simple() {
        assert_eq!(span("$x^2$ rest", 0, "$"), Some("x^2".to_owned()));
        assert_eq!(
            match_inline("$x$", 0, "$"),
            InlineMatch::Span { content: 1..2, end: 3 }
        );
    }

    #[test]
    fn test_inline_space_after_open_is_literal() {
        assert_eq!(match_inline("$ x$", 0, "$"), InlineMatch::Literal(1));
    }

    #[test]
    fn test_inline_space_before_close_is_literal() {
        assert_eq!(match_inline("$x $", 0, "$"), InlineMatch::Literal(1));
    }

    #[test]
    fn test_inline_digit_after_close_is_literal() {
        assert_eq!(
            match_inline("costs $5 and $6 total", 6, "$"),
            InlineMatch::Literal(1)
        );
        assert_eq!(match_inline("$x$1", 0, "$"), InlineMatch::Literal(1));
    }

    #[test]
    fn test_inline_empty_content_emits_both_markers() {
        assert_eq!(match_inline("$$", 0, "$"), InlineMatch::Literal(2));
    }

    #[test]
    fn test_inline_no_close() {
        assert_eq!(match_inline("$x", 0, "$"), InlineMatch::Literal(1));
        assert_eq!(match_inline("$", 0, "$"), InlineMatch::Literal(1));
    }

    #[test]
    fn test_inline_skips_escaped_close() {
        assert_eq!(span(r"$a\$b$", 0, "$"), Some(r"a\$b".to_owned()));
    }

    #[test]
    fn test_inline_even_backslashes_do_not_escape() {
        assert_eq!(span(r"$a\\$b", 0, "$"), Some(r"a\\".to_owned()));
    }

    #[test]
    fn test_inline_only_first_candidate_is_tried() {
        // First unescaped close is followed by a digit; no further search.
        assert_eq!(match_inline("$a$1 b$", 0, "$"), InlineMatch::Literal(1));
    }

    #[test]
    fn test_inline_multi_char_marker() {
        assert_eq!(span("==mark== x", 0, "=="), Some("mark".to_owned()));
    }

    #[test]
    fn test_block_single_line() {
        let lines = ["$$ x + y $$", "after"];
        assert_eq!(
            match_block(&lines, 0, "$$"),
            Some(BlockMatch {
                content: "x + y \n".to_owned(),
                next_line: 1,
            })
        );
    }

    #[test]
    fn test_block_multi_line() {
        let lines = ["$$", "a", "  b", "$$", "after"];
        assert_eq!(
            match_block(&lines, 0, "$$"),
            Some(BlockMatch {
                content: "a\n  b\n".to_owned(),
                next_line: 4,
            })
        );
    }

    #[test]
    fn test_block_partial_first_and_last_lines() {
        let lines = ["$$ a", "b", "c $$"];
        assert_eq!(
            match_block(&lines, 0, "$$").unwrap().content,
            " a\nb\nc "
        );
    }

    #[test]
    fn test_block_indented_strips_opening_indent() {
        let lines = ["  $$", "    a", "  $$"];
        assert_eq!(match_block(&lines, 0, "$$").unwrap().content, "  a\n");
    }

    #[test]
    fn test_block_unterminated_runs_to_end() {
        let lines = ["$$", "a", "b"];
        assert_eq!(
            match_block(&lines, 0, "$$"),
            Some(BlockMatch {
                content: "a\nb\n".to_owned(),
                next_line: 3,
            })
        );
    }

    #[test]
    fn test_block_requires_marker_at_line_start() {
        assert_eq!(match_block(&["text $$"], 0, "$$"), None);
    }

    #[test]
    fn test_register_replaces_by_name_and_orders_markers() {
        let mut rules = RuleSet::new();
        rules.register(Rule::inline("math_inline", "$", |_, _| String::new()));
        rules.register(Rule::block("math_block", "$$", |_, _| String::new()));
        rules.register(Rule::inline("math_inline", "$", |_, _| "x".to_owned()));

        let names: Vec<_> = rules.rules.iter().map(Rule::name).collect();
        assert_eq!(names, vec!["math_block", "math_inline"]);
        assert!(rules.is_inline_start('$'));
        assert!(!rules.is_inline_start(':'));
    }
}
