//! Token tree.
//!
//! A flat sequence of `CommonMark` events interleaved with the custom tokens
//! captured during preprocessing. Start and end events nest as the parser
//! emitted them; component and span tokens nest among themselves.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::attrs::Attrs;
use crate::preprocess::{BLOCK_PREFIX, BLOCK_SUFFIX, INLINE_CLOSE, INLINE_OPEN, Preprocessed};
use crate::rule::RuleToken;

/// One node of the token tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Standard markdown event.
    Event(Event<'static>),
    /// Custom syntax matched by a rule.
    Rule(RuleToken),
    /// Inline code tagged with a language.
    Code { content: String, attrs: Attrs },
    /// `::name{attrs}` block start.
    ComponentOpen { name: String, attrs: Attrs },
    /// Block component end.
    ComponentClose { name: String },
    /// `:name{attrs}` shorthand line.
    Component { name: String, attrs: Attrs },
    /// `[` of a bracketed span.
    SpanOpen(Attrs),
    /// `]{...}` of a bracketed span.
    SpanClose,
}

/// Parser options used for every document.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Parse preprocessed source and splice captured tokens back in.
pub(crate) fn build(pre: Preprocessed) -> Vec<Token> {
    let Preprocessed { source, captures } = pre;
    let mut captures: Vec<Option<Token>> = captures.into_iter().map(Some).collect();
    let mut take = |n: usize| captures.get_mut(n).and_then(Option::take);

    let mut tokens = Vec::new();
    let mut pending_text = String::new();

    for event in Parser::new_ext(&source, parser_options()) {
        if let Event::Text(text) = &event {
            pending_text.push_str(text);
            continue;
        }
        flush_text(&mut pending_text, &mut tokens, &mut take);

        match event {
            // Placeholder blocks render nothing of their own.
            Event::Start(Tag::HtmlBlock) | Event::End(TagEnd::HtmlBlock) => {}
            Event::Html(html) | Event::InlineHtml(html) if html.contains(BLOCK_PREFIX) => {
                split_block_placeholders(&html, &mut tokens, &mut take);
            }
            other => tokens.push(Token::Event(other.into_static())),
        }
    }
    flush_text(&mut pending_text, &mut tokens, &mut take);

    tokens
}

/// Emit merged text, replacing inline placeholders.
fn flush_text(
    text: &mut String,
    tokens: &mut Vec<Token>,
    take: &mut impl FnMut(usize) -> Option<Token>,
) {
    if text.is_empty() {
        return;
    }
    let mut rest = text.as_str();
    while let Some(start) = rest.find(INLINE_OPEN) {
        let after = &rest[start + INLINE_OPEN.len_utf8()..];
        let token = after.find(INLINE_CLOSE).and_then(|end| {
            let n = after[..end].parse().ok()?;
            Some((take(n)?, end))
        });
        match token {
            Some((token, end)) => {
                push_text(tokens, &rest[..start]);
                tokens.push(token);
                rest = &after[end + INLINE_CLOSE.len_utf8()..];
            }
            None => {
                push_text(tokens, &rest[..start + INLINE_OPEN.len_utf8()]);
                rest = after;
            }
        }
    }
    push_text(tokens, rest);
    text.clear();
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if !text.is_empty() {
        tokens.push(Token::Event(Event::Text(CowStr::from(text.to_owned()))));
    }
}

/// Replace `<!--quire:N-->` markers inside raw HTML, keeping other markup.
fn split_block_placeholders(
    html: &str,
    tokens: &mut Vec<Token>,
    take: &mut impl FnMut(usize) -> Option<Token>,
) {
    let mut rest = html;
    while let Some(start) = rest.find(BLOCK_PREFIX) {
        let after = &rest[start + BLOCK_PREFIX.len()..];
        let Some(end) = after.find(BLOCK_SUFFIX) else {
            break;
        };
        let token = after[..end].parse::<usize>().ok().and_then(|n| take(n));
        let consumed = start + BLOCK_PREFIX.len() + end + BLOCK_SUFFIX.len();
        match token {
            Some(token) => {
                push_html(tokens, &rest[..start]);
                tokens.push(token);
            }
            None => push_html(tokens, &rest[..consumed]),
        }
        rest = &rest[consumed..];
    }
    push_html(tokens, rest);
}

fn push_html(tokens: &mut Vec<Token>, html: &str) {
    if !html.trim().is_empty() {
        tokens.push(Token::Event(Event::Html(CowStr::from(html.to_owned()))));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::preprocess::preprocess;
    use crate::rule::{Rule, RuleSet};

    fn parse(source: &str) -> Vec<Token> {
        let mut rules = RuleSet::new();
        rules.register(Rule::inline("math_inline", "$", |_, _| String::new()));
        rules.register(Rule::block("math_block", "$$", |_, _| String::new()));
        build(preprocess(source, &rules))
    }

    fn text(s: &str) -> Token {
        Token::Event(Event::Text(CowStr::from(s.to_owned())))
    }

    fn rule(name: &str, content: &str) -> Token {
        Token::Rule(RuleToken {
            rule: name.to_owned(),
            content: content.to_owned(),
            attrs: Attrs::new(),
        })
    }

    #[test]
    fn test_inline_placeholder_splices_into_paragraph() {
        assert_eq!(
            parse("a $x$ b"),
            vec![
                Token::Event(Event::Start(Tag::Paragraph)),
                text("a "),
                rule("math_inline", "x"),
                text(" b"),
                Token::Event(Event::End(TagEnd::Paragraph)),
            ]
        );
    }

    #[test]
    fn test_placeholder_at_line_start_stays_inline() {
        let tokens = parse("$x$ starts the line");
        assert_eq!(tokens[0], Token::Event(Event::Start(Tag::Paragraph)));
        assert_eq!(tokens[1], rule("math_inline", "x"));
    }

    #[test]
    fn test_block_placeholder_is_a_block() {
        assert_eq!(
            parse("$$\nx\n$$\n"),
            vec![rule("math_block", "x\n")]
        );
    }

    #[test]
    fn test_block_placeholder_interrupts_paragraph() {
        let tokens = parse("text\n$$ y $$\nmore");
        assert!(tokens.contains(&rule("math_block", "y \n")));
        assert_eq!(
            tokens.iter().filter(|t| **t == Token::Event(Event::Start(Tag::Paragraph))).count(),
            2
        );
    }

    #[test]
    fn test_component_contains_markdown() {
        let tokens = parse("::note\n**bold**\n::\n");
        assert!(matches!(&tokens[0], Token::ComponentOpen { name, .. } if name == "note"));
        assert!(tokens.contains(&Token::Event(Event::Start(Tag::Strong))));
        assert!(matches!(tokens.last(), Some(Token::ComponentClose { name }) if name == "note"));
    }

    #[test]
    fn test_text_is_merged() {
        let tokens = parse("don't stop");
        let texts: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t, Token::Event(Event::Text(_))))
            .collect();
        assert_eq!(texts.len(), 1);
    }

    #[test]
    fn test_user_html_comment_kept() {
        let tokens = parse("<!-- note -->\n");
        assert_eq!(
            tokens,
            vec![Token::Event(Event::Html(CowStr::from("<!-- note -->\n".to_owned())))]
        );
    }

    #[test]
    fn test_span_tokens_nest_inside_link() {
        let tokens = parse("[[t]{.x}](/a)");
        assert!(tokens.contains(&Token::SpanOpen(Attrs::parse(".x"))));
        assert!(tokens.contains(&Token::SpanClose));
    }
}
