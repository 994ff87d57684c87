//! `$inline$` and `$$ block $$` formulas.

use crate::html::{escape_html, json_string};
use crate::plugins::FORMULA;
use crate::rule::{Rule, RuleToken};

const MACRO_COMMANDS: [&str; 6] = [
    "\\def",
    "\\gdef",
    "\\newcommand",
    "\\renewcommand",
    "\\DeclareMathOperator",
    "\\let",
];

pub(crate) fn inline_rule() -> Rule {
    Rule::inline("math_inline", "$", |token, _ctx| {
        format!(
            r#"<InlineMath data="{}"></InlineMath>"#,
            escape_attribute(&token.content)
        )
    })
    .with_text(|_| Some(FORMULA.to_owned()))
}

pub(crate) fn block_rule() -> Rule {
    Rule::block("math_block", "$$", |token, ctx| {
        let id = ctx.expr(json_string(&token.content));
        format!("<BlockMath {}></BlockMath>\n", ctx.mode().bind("data", &id))
    })
    .with_text(block_text)
}

fn block_text(token: &RuleToken) -> Option<String> {
    (!is_macro_only(&token.content)).then(|| FORMULA.to_owned())
}

/// Quotes and line breaks escaped so the formula fits a quoted attribute.
fn escape_attribute(content: &str) -> String {
    escape_html(content).replace('\n', "&#10;")
}

/// Whether every non-blank line defines a macro.
fn is_macro_only(content: &str) -> bool {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    lines.peek().is_some()
        && lines.all(|line| MACRO_COMMANDS.iter().any(|cmd| line.starts_with(cmd)))
}
