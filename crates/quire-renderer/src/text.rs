//! Plain-text extraction for the search index.
//!
//! Walks the token tree rather than rendered markup so that no markup,
//! bindings or slot identifiers leak into the text.

use pulldown_cmark::{Event, Tag, TagEnd};

use crate::plugins::code::split_info;
use crate::renderer::{MarkdownRenderer, code_info, matching_end};
use crate::rule::RuleKind;
use crate::token::Token;

pub(crate) fn extract(md: &MarkdownRenderer, tokens: &[Token]) -> String {
    let mut out = String::new();
    collect(md, tokens, &mut out);
    out.truncate(out.trim_end().len());
    out
}

fn collect(md: &MarkdownRenderer, tokens: &[Token], out: &mut String) {
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Event(Event::Start(Tag::CodeBlock(kind))) => {
                let (lang, caption) = split_info(code_info(kind));
                if !lang.is_empty() && md.typesetter(lang).is_some() {
                    collect(md, &md.parse_inline(caption), out);
                    out.push('\n');
                }
                i = matching_end(tokens, i);
            }
            Token::Event(event) => push_event(event, out),
            Token::Rule(token) => {
                let Some(rule) = md.rules().get(&token.rule) else {
                    i += 1;
                    continue;
                };
                if let Some(text) = rule.text(token) {
                    out.push_str(&text);
                    if rule.kind() == RuleKind::Block {
                        out.push('\n');
                    }
                }
            }
            Token::Code { content, .. } => out.push_str(content),
            Token::ComponentClose { .. } => out.push('\n'),
            Token::ComponentOpen { .. }
            | Token::Component { .. }
            | Token::SpanOpen(_)
            | Token::SpanClose => {}
        }
        i += 1;
    }
}

fn push_event(event: &Event<'_>, out: &mut String) {
    match event {
        Event::Text(text) | Event::Code(text) => out.push_str(text),
        Event::SoftBreak => out.push(' '),
        Event::HardBreak => out.push('\n'),
        Event::End(
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::Item
            | TagEnd::BlockQuote(_)
            | TagEnd::TableRow
            | TagEnd::TableHead,
        ) => out.push('\n'),
        Event::End(TagEnd::TableCell) => out.push(' '),
        _ => {}
    }
}
