//! Source preprocessing.
//!
//! Custom syntax is recognised here, before the `CommonMark` parser runs.
//! Each match is stored as a captured [`Token`] and replaced by a
//! placeholder the parser passes through untouched:
//!
//! - block matches (block rules, component markers) become an HTML comment
//!   `<!--quire:N-->` on a line of its own;
//! - inline matches (inline rules, bracketed spans, attributed inline code)
//!   become `U+E000 N U+E001`, which the parser treats as plain text.
//!
//! Fenced and indented code, table delimiter rows, code spans, link
//! destinations and raw tags are copied verbatim.

use std::sync::LazyLock;

use regex::Regex;

use crate::attrs::{Attrs, leading_group};
use crate::fence::FenceTracker;
use crate::rule::{InlineMatch, RuleKind, RuleSet, RuleToken, match_block, match_inline};
use crate::token::Token;

pub(crate) const INLINE_OPEN: char = '\u{E000}';
pub(crate) const INLINE_CLOSE: char = '\u{E001}';
pub(crate) const BLOCK_PREFIX: &str = "<!--quire:";
pub(crate) const BLOCK_SUFFIX: &str = "-->";

static QUOTE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[ \t]*>[ \t]?)*").expect("valid quote pattern"));

static COMPONENT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(:{2,})([A-Za-z][\w-]*)").expect("valid component pattern")
});

static COMPONENT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(:{2,})\s*$").expect("valid close pattern"));

static COMPONENT_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z][\w-]*)").expect("valid shorthand pattern"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d{1,9}[.)])(?:[ \t]|$)").expect("valid list pattern"));

static TABLE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?[ \t]*$")
        .expect("valid delimiter pattern")
});

static RAW_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>|<[A-Za-z][A-Za-z0-9+.-]{1,31}:[^\s<>]*>)")
        .expect("valid tag pattern")
});

/// Preprocessed source and the tokens its placeholders stand for.
#[derive(Debug, Default)]
pub(crate) struct Preprocessed {
    pub source: String,
    pub captures: Vec<Token>,
}

/// Replace custom syntax in `source` with placeholders.
pub(crate) fn preprocess(source: &str, rules: &RuleSet) -> Preprocessed {
    let mut pre = Preprocessor {
        rules,
        out: Preprocessed::default(),
        chunk: Vec::new(),
        components: Vec::new(),
        paragraph: false,
        list_content: None,
    };
    pre.run(source);
    pre.out
}

struct Preprocessor<'r> {
    rules: &'r RuleSet,
    out: Preprocessed,
    /// Consecutive text lines scanned together so inline spans may wrap.
    chunk: Vec<String>,
    /// Open components: colon count and name.
    components: Vec<(usize, String)>,
    /// The previous line continues a paragraph, so indentation is not code.
    paragraph: bool,
    /// Content column of the innermost open list item.
    list_content: Option<usize>,
}

impl Preprocessor<'_> {
    fn run(&mut self, source: &str) {
        let body = source.strip_suffix('\n').unwrap_or(source);
        let lines: Vec<&str> = body
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let mut fence = FenceTracker::new();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let quote = QUOTE_PREFIX.find(line).map_or("", |m| m.as_str());
            let rest = &line[quote.len()..];
            let trimmed = rest.trim_start();

            if !fence.in_fence() && self.is_indented_code(rest) {
                self.flush();
                self.push_line(line);
                i += 1;
                continue;
            }

            if fence.update(line) || fence.in_fence() {
                self.flush();
                self.push_line(line);
                self.paragraph = false;
                i += 1;
                continue;
            }

            if let Some(next) = self.try_block_rule(&lines, i, quote) {
                self.paragraph = false;
                i = next;
                continue;
            }

            if self.try_component(quote, rest) {
                self.paragraph = false;
                i += 1;
                continue;
            }

            if trimmed.is_empty() {
                self.flush();
                self.push_line(line);
                self.paragraph = false;
            } else if trimmed.contains('|') && TABLE_DELIMITER.is_match(trimmed) {
                self.flush();
                self.push_line(line);
                self.paragraph = true;
            } else if trimmed.starts_with('#') || trimmed.starts_with('|') {
                self.flush();
                self.chunk.push(line.to_owned());
                self.flush();
                self.paragraph = !trimmed.starts_with('#');
            } else {
                if let Some(item) = LIST_ITEM.find(trimmed) {
                    self.list_content =
                        Some(indent_width(rest) + item.as_str().trim_end().len() + 1);
                }
                if !quote.is_empty() || LIST_ITEM.is_match(trimmed) {
                    self.flush();
                }
                self.chunk.push(line.to_owned());
                self.paragraph = true;
            }
            i += 1;
        }

        self.flush();
        while let Some((_, name)) = self.components.pop() {
            self.push_block_capture("", Token::ComponentClose { name });
        }

        if !source.ends_with('\n') {
            self.out.source.pop();
        }
    }

    /// Whether `rest` (the line after any quote markers) is an indented code
    /// line. Paragraph continuations never are; inside a list the indent is
    /// counted from the item's content column.
    fn is_indented_code(&mut self, rest: &str) -> bool {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() || self.paragraph {
            return false;
        }
        let indent = indent_width(rest);
        if self
            .list_content
            .is_some_and(|content| indent < content && !LIST_ITEM.is_match(trimmed))
        {
            self.list_content = None;
        }
        indent >= self.list_content.unwrap_or(0) + 4
    }

    fn push_line(&mut self, line: &str) {
        self.out.source.push_str(line);
        self.out.source.push('\n');
    }

    fn capture(&mut self, token: Token) -> usize {
        self.out.captures.push(token);
        self.out.captures.len() - 1
    }

    fn push_block_capture(&mut self, prefix: &str, token: Token) {
        let n = self.capture(token);
        let line = format!("{prefix}{BLOCK_PREFIX}{n}{BLOCK_SUFFIX}");
        self.push_line(&line);
    }

    fn flush(&mut self) {
        if self.chunk.is_empty() {
            return;
        }
        let text = self.chunk.join("\n");
        self.chunk.clear();
        let scanned = self.scan_inline(&text);
        self.out.source.push_str(&scanned);
        self.out.source.push('\n');
    }

    /// Match a block rule at `lines[start]`, returning the next line index.
    fn try_block_rule(&mut self, lines: &[&str], start: usize, quote: &str) -> Option<usize> {
        let rest = &lines[start][quote.len()..];
        let rules = self.rules;
        let rule = rules
            .of_kind(RuleKind::Block)
            .find(|r| rest.trim_start().starts_with(r.marker()))?;

        let stripped: Vec<&str> = lines[start..]
            .iter()
            .map(|l| QUOTE_PREFIX.find(l).map_or(*l, |m| &l[m.end()..]))
            .collect();
        let matched = match_block(&stripped, 0, rule.marker())?;

        self.flush();
        let indent = &rest[..rest.len() - rest.trim_start().len()];
        let prefix = format!("{quote}{indent}");
        self.push_block_capture(
            &prefix,
            Token::Rule(RuleToken {
                rule: rule.name().to_owned(),
                content: matched.content,
                attrs: Attrs::new(),
            }),
        );
        Some(start + matched.next_line)
    }

    /// Match a component marker line.
    fn try_component(&mut self, quote: &str, rest: &str) -> bool {
        let trimmed = rest.trim_start();
        let indent = &rest[..rest.len() - trimmed.len()];
        let prefix = format!("{quote}{indent}");

        if let Some(caps) = COMPONENT_CLOSE.captures(trimmed) {
            let colons = caps[1].len();
            let Some(pos) = self.components.iter().rposition(|(c, _)| *c == colons) else {
                return false;
            };
            self.flush();
            // Closing an outer component closes everything opened inside it.
            while self.components.len() > pos {
                if let Some((_, name)) = self.components.pop() {
                    self.push_block_capture(&prefix, Token::ComponentClose { name });
                }
            }
            return true;
        }

        if let Some(caps) = COMPONENT_OPEN.captures(trimmed) {
            let Some(attrs) = trailing_attrs(&trimmed[caps[0].len()..]) else {
                return false;
            };
            let colons = caps[1].len();
            let name = caps[2].to_owned();
            self.flush();
            self.components.push((colons, name.clone()));
            self.push_block_capture(&prefix, Token::ComponentOpen { name, attrs });
            return true;
        }

        if let Some(caps) = COMPONENT_SHORTHAND.captures(trimmed) {
            let Some(attrs) = trailing_attrs(&trimmed[caps[0].len()..]) else {
                return false;
            };
            let name = caps[1].to_owned();
            self.flush();
            self.push_block_capture(&prefix, Token::Component { name, attrs });
            return true;
        }

        false
    }

    fn inline_placeholder(&mut self, token: Token) -> String {
        let n = self.capture(token);
        format!("{INLINE_OPEN}{n}{INLINE_CLOSE}")
    }

    /// Replace inline matches in a chunk of text.
    fn scan_inline(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while let Some(c) = text[i..].chars().next() {
            match c {
                '\\' => {
                    let next_len = text[i + 1..].chars().next().map_or(0, char::len_utf8);
                    out.push_str(&text[i..i + 1 + next_len]);
                    i += 1 + next_len;
                }
                '`' => i += self.code_span(text, i, &mut out),
                '<' => {
                    let len = RAW_TAG.find(&text[i..]).map_or(1, |m| m.end());
                    out.push_str(&text[i..i + len]);
                    i += len;
                }
                ']' if text[i + 1..].starts_with('(') => {
                    let len = link_destination_len(&text[i + 1..]).map_or(1, |n| n + 1);
                    out.push_str(&text[i..i + len]);
                    i += len;
                }
                '[' if !text[..i].ends_with('!') => match self.bracketed_span(text, i) {
                    Some((replacement, len)) => {
                        out.push_str(&replacement);
                        i += len;
                    }
                    None => {
                        out.push('[');
                        i += 1;
                    }
                },
                c if self.rules.is_inline_start(c) => i += self.inline_rule(text, i, &mut out),
                c => {
                    out.push(c);
                    i += c.len_utf8();
                }
            }
        }

        out
    }

    /// Handle a backtick run at `i`. Returns bytes consumed.
    fn code_span(&mut self, text: &str, i: usize, out: &mut String) -> usize {
        let run = text[i..].chars().take_while(|&c| c == '`').count();
        let Some(close) = find_backtick_run(text, i + run, run) else {
            out.push_str(&text[i..i + run]);
            return run;
        };
        let end = close + run;

        if let Some((group, group_len)) = leading_group(&text[end..]) {
            let attrs = Attrs::parse(group);
            let tagged = attrs.get("lang").is_some()
                || attrs.classes().any(|c| c.starts_with("language-"));
            if tagged {
                let content = normalize_code_span(&text[i + run..close]);
                let placeholder = self.inline_placeholder(Token::Code { content, attrs });
                out.push_str(&placeholder);
                return end + group_len - i;
            }
        }

        out.push_str(&text[i..end]);
        end - i
    }

    /// Handle `[text]{attrs}` at `i`.
    fn bracketed_span(&mut self, text: &str, i: usize) -> Option<(String, usize)> {
        let close = matching_bracket(text, i)?;
        let (group, group_len) = leading_group(&text[close + 1..])?;
        let inner = &text[i + 1..close];
        if inner.starts_with('^') {
            return None;
        }

        let open = self.inline_placeholder(Token::SpanOpen(Attrs::parse(group)));
        let body = self.scan_inline(inner);
        let end = self.inline_placeholder(Token::SpanClose);
        Some((format!("{open}{body}{end}"), close + 1 + group_len - i))
    }

    /// Try inline rules at `i`. Returns bytes consumed.
    fn inline_rule(&mut self, text: &str, i: usize, out: &mut String) -> usize {
        let rules = self.rules;
        let Some(rule) = rules
            .of_kind(RuleKind::Inline)
            .find(|r| text[i..].starts_with(r.marker()))
        else {
            let len = text[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&text[i..i + len]);
            return len;
        };

        match match_inline(text, i, rule.marker()) {
            InlineMatch::Literal(len) => {
                out.push_str(&text[i..i + len]);
                len
            }
            InlineMatch::Span { content, end } => {
                let (attrs, attrs_len) = leading_group(&text[end..])
                    .map_or((Attrs::new(), 0), |(g, len)| (Attrs::parse(g), len));
                let placeholder = self.inline_placeholder(Token::Rule(RuleToken {
                    rule: rule.name().to_owned(),
                    content: text[content].to_owned(),
                    attrs,
                }));
                out.push_str(&placeholder);
                end + attrs_len - i
            }
        }
    }
}

/// Leading indentation in columns, tabs advancing to the next multiple of 4.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

/// Attributes on a component line; `None` if anything else follows.
fn trailing_attrs(rest: &str) -> Option<Attrs> {
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Some(Attrs::new());
    }
    let (group, len) = leading_group(rest)?;
    rest[len..].trim().is_empty().then(|| Attrs::parse(group))
}

/// Find a backtick run of exactly `len` starting at or after `from`.
fn find_backtick_run(text: &str, from: usize, len: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn normalize_code_span(raw: &str) -> String {
    let content = raw.replace('\n', " ");
    let strip = content.len() >= 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && !content.trim().is_empty();
    if strip {
        content[1..content.len() - 1].to_owned()
    } else {
        content
    }
}

/// Length of `(...)` at the start of `s`, honouring nested parentheses.
fn link_destination_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Position of the `]` matching the `[` at `open`.
fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in text[open..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rule::Rule;

    fn rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.register(Rule::inline("math_inline", "$", |_, _| String::new()));
        rules.register(Rule::block("math_block", "$$", |_, _| String::new()));
        rules
    }

    fn rule_token(rule: &str, content: &str) -> Token {
        Token::Rule(RuleToken {
            rule: rule.to_owned(),
            content: content.to_owned(),
            attrs: Attrs::new(),
        })
    }

    fn run(source: &str) -> Preprocessed {
        preprocess(source, &rules())
    }

    #[test]
    fn test_plain_text_unchanged() {
        let source = "# Title\n\nSome *text* here.\n";
        let pre = run(source);
        assert_eq!(pre.source, source);
        assert!(pre.captures.is_empty());
    }

    #[test]
    fn test_inline_rule_placeholder() {
        let pre = run("Energy $E=mc^2$ here");
        assert_eq!(pre.source, "Energy \u{E000}0\u{E001} here");
        assert_eq!(pre.captures, vec![rule_token("math_inline", "E=mc^2")]);
    }

    #[test]
    fn test_inline_rule_may_wrap_lines() {
        let pre = run("a $x\ny$ b");
        assert_eq!(pre.captures, vec![rule_token("math_inline", "x\ny")]);
    }

    #[test]
    fn test_inline_rule_attrs() {
        let pre = run("$x${.big}");
        let Token::Rule(token) = &pre.captures[0] else {
            panic!("expected rule token");
        };
        assert_eq!(token.attrs.get("class"), Some("big"));
        assert_eq!(pre.source, "\u{E000}0\u{E001}");
    }

    #[test]
    fn test_literal_markers_survive() {
        let pre = run("costs $5 or $ 6, escaped \\$x$");
        assert_eq!(pre.source, "costs $5 or $ 6, escaped \\$x$");
        assert!(pre.captures.is_empty());
    }

    #[test]
    fn test_code_span_and_fence_are_skipped() {
        let source = "use `$x$` here\n\n```\n$y$\n$$\n```\n";
        let pre = run(source);
        assert_eq!(pre.source, source);
        assert!(pre.captures.is_empty());
    }

    #[test]
    fn test_table_delimiter_row_is_verbatim() {
        let mut rules = rules();
        rules.register(Rule::inline("icon", ":", |_, _| String::new()));
        let source = "| a | b |\n|:--|--:|\n| 1 | 2 |\n";
        let pre = preprocess(source, &rules);
        assert_eq!(pre.source, source);
        assert!(pre.captures.is_empty());

        let pre = preprocess("a | b\n:---|:---:\n", &rules);
        assert_eq!(pre.source, "a | b\n:---|:---:\n");
    }

    #[test]
    fn test_indented_code_is_verbatim() {
        let source = "    let a = $x$ + 1;\n\n    $$\n\ntext $y$\n";
        let pre = run(source);
        assert_eq!(pre.source, "    let a = $x$ + 1;\n\n    $$\n\ntext \u{E000}0\u{E001}\n");
        assert_eq!(pre.captures, vec![rule_token("math_inline", "y")]);
    }

    #[test]
    fn test_indented_paragraph_continuation_is_scanned() {
        let pre = run("text\n    more $x$\n");
        assert_eq!(pre.source, "text\n    more \u{E000}0\u{E001}\n");
    }

    #[test]
    fn test_indented_code_in_list_counts_from_content() {
        let pre = run("- item\n\n    $a$\n\n      $b$\n");
        assert_eq!(
            pre.source,
            "- item\n\n    \u{E000}0\u{E001}\n\n      $b$\n"
        );
        assert_eq!(pre.captures, vec![rule_token("math_inline", "a")]);
    }

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("    x"), 4);
        assert_eq!(indent_width("  \tx"), 4);
        assert_eq!(indent_width("x"), 0);
    }

    #[test]
    fn test_link_destination_is_skipped() {
        let source = "[a](https://x.com/$a$b)";
        assert_eq!(run(source).source, source);
    }

    #[test]
    fn test_block_rule() {
        let pre = run("before\n\n$$\na\nb\n$$\n\nafter\n");
        assert_eq!(pre.source, "before\n\n<!--quire:0-->\n\nafter\n");
        assert_eq!(pre.captures, vec![rule_token("math_block", "a\nb\n")]);
    }

    #[test]
    fn test_block_rule_in_blockquote() {
        let pre = run("> $$\n> x\n> $$\n");
        assert_eq!(pre.source, "> <!--quire:0-->\n");
        assert_eq!(pre.captures, vec![rule_token("math_block", "x\n")]);
    }

    #[test]
    fn test_block_rule_in_list_keeps_indent() {
        let pre = run("- item\n\n  $$ x $$\n");
        assert_eq!(pre.source, "- item\n\n  <!--quire:0-->\n");
    }

    #[test]
    fn test_components() {
        let pre = run("::note{warning}\nBody\n::\n:Index\n");
        assert_eq!(
            pre.source,
            "<!--quire:0-->\nBody\n<!--quire:1-->\n<!--quire:2-->\n"
        );
        assert_eq!(
            pre.captures,
            vec![
                Token::ComponentOpen {
                    name: "note".to_owned(),
                    attrs: Attrs::parse("warning"),
                },
                Token::ComponentClose {
                    name: "note".to_owned()
                },
                Token::Component {
                    name: "Index".to_owned(),
                    attrs: Attrs::new(),
                },
            ]
        );
    }

    #[test]
    fn test_nested_components_close_by_colon_count() {
        let pre = run(":::fold\n::note\nx\n::\n:::\n");
        let names: Vec<_> = pre
            .captures
            .iter()
            .map(|t| match t {
                Token::ComponentOpen { name, .. } => format!("+{name}"),
                Token::ComponentClose { name } => format!("-{name}"),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["+fold", "+note", "-note", "-fold"]);
    }

    #[test]
    fn test_unclosed_component_is_closed_at_end() {
        let pre = run("::note\ntext");
        assert!(matches!(
            pre.captures.last(),
            Some(Token::ComponentClose { name }) if name == "note"
        ));
    }

    #[test]
    fn test_stray_close_is_text() {
        let pre = run("::\n");
        assert_eq!(pre.source, "::\n");
        assert!(pre.captures.is_empty());
    }

    #[test]
    fn test_bracketed_span() {
        let pre = run("a [red $x$]{.red} b [link](u) [^1]{.x}");
        assert_eq!(
            pre.source,
            "a \u{E000}0\u{E001}red \u{E000}1\u{E001}\u{E000}2\u{E001} b [link](u) [^1]{.x}"
        );
        assert_eq!(pre.captures[0], Token::SpanOpen(Attrs::parse(".red")));
        assert_eq!(pre.captures[1], rule_token("math_inline", "x"));
        assert_eq!(pre.captures[2], Token::SpanClose);
    }

    #[test]
    fn test_tagged_inline_code() {
        let pre = run("call `f(x)`{lang=rust} now");
        assert_eq!(pre.source, "call \u{E000}0\u{E001} now");
        assert_eq!(
            pre.captures,
            vec![Token::Code {
                content: "f(x)".to_owned(),
                attrs: Attrs::parse("lang=rust"),
            }]
        );
    }

    #[test]
    fn test_untagged_inline_code_attrs_stay() {
        let source = "`x`{.plain}";
        assert_eq!(run(source).source, source);
    }

    #[test]
    fn test_raw_tag_is_skipped() {
        let source = r#"<span data-x="$a$">t</span>"#;
        assert_eq!(run(source).source, source);
    }

    #[test]
    fn test_normalize_code_span() {
        assert_eq!(normalize_code_span(" a "), "a");
        assert_eq!(normalize_code_span("  "), "  ");
        assert_eq!(normalize_code_span("a\nb"), "a b");
    }
}
