//! Markdown pipeline: parse to tokens, render tokens to component markup.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Tag, TagEnd};

use crate::attrs::Attrs;
use crate::context::{Highlighter, ImageProbe, PlainHighlighter, RenderContext, TocEntry, Typesetter};
use crate::html::{TableState, escape_html, resolve_link, strip_comments};
use crate::plugins;
use crate::preprocess::preprocess;
use crate::rule::{Rule, RuleSet};
use crate::text;
use crate::token::{self, Token};

/// Result of rendering a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// Template markup.
    pub html: String,
    /// Headings in document order.
    pub toc: Vec<TocEntry>,
    /// Recoverable problems, such as failed typesetting.
    pub warnings: Vec<String>,
}

/// Markdown to component-markup renderer.
///
/// Holds the registered rules and the external collaborators. Rendering
/// state lives in the [`RenderContext`] passed to each call, so one renderer
/// serves every document.
///
/// # Example
///
/// ```
/// use quire_renderer::{MarkdownRenderer, NullSink, Page, RenderContext, Slots};
///
/// let md = MarkdownRenderer::new();
/// let tokens = md.parse("## Intro\n\nEnergy is $E=mc^2$.");
///
/// let mut slots = Slots::new();
/// let page = Page { pathname: "docs/a.md", url: "/a", filename: "a" };
/// let mut ctx = RenderContext::new(page, &mut slots, &NullSink);
/// let result = md.render(&tokens, &mut ctx);
///
/// assert!(result.html.contains(r#"<Heading :level="2" :id="1">Intro</Heading>"#));
/// assert!(result.html.contains(r#"<InlineMath data="E=mc^2"></InlineMath>"#));
/// assert_eq!(md.text(&tokens), "Intro\nEnergy is [formula].");
/// ```
pub struct MarkdownRenderer {
    rules: RuleSet,
    highlighter: Arc<dyn Highlighter>,
    typesetters: Vec<Arc<dyn Typesetter>>,
    image_probe: Option<Arc<dyn ImageProbe>>,
}

impl MarkdownRenderer {
    /// Renderer with the built-in math and icon rules and a plain
    /// highlighter.
    #[must_use]
    pub fn new() -> Self {
        let mut rules = RuleSet::new();
        for rule in plugins::builtin_rules() {
            rules.register(rule);
        }
        Self {
            rules,
            highlighter: Arc::new(PlainHighlighter),
            typesetters: Vec::new(),
            image_probe: None,
        }
    }

    #[must_use]
    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Add a typesetter. The first one supporting a language handles it.
    #[must_use]
    pub fn with_typesetter(mut self, typesetter: Arc<dyn Typesetter>) -> Self {
        self.typesetters.push(typesetter);
        self
    }

    #[must_use]
    pub fn with_image_probe(mut self, probe: Arc<dyn ImageProbe>) -> Self {
        self.image_probe = Some(probe);
        self
    }

    /// Register a custom syntax, replacing any rule with the same name.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.register(rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub(crate) fn highlighter(&self) -> &dyn Highlighter {
        self.highlighter.as_ref()
    }

    pub(crate) fn typesetter(&self, lang: &str) -> Option<&dyn Typesetter> {
        self.typesetters
            .iter()
            .find(|t| t.supports(lang))
            .map(AsRef::as_ref)
    }

    pub(crate) fn image_probe(&self) -> Option<&Arc<dyn ImageProbe>> {
        self.image_probe.as_ref()
    }

    /// Parse markdown into the token tree.
    #[must_use]
    pub fn parse(&self, markdown: &str) -> Vec<Token> {
        token::build(preprocess(markdown, &self.rules))
    }

    /// Parse a one-line fragment, dropping the paragraph around it.
    #[must_use]
    pub fn parse_inline(&self, markdown: &str) -> Vec<Token> {
        let mut tokens = self.parse(markdown);
        let wrapped = matches!(tokens.first(), Some(Token::Event(Event::Start(Tag::Paragraph))))
            && matches!(tokens.last(), Some(Token::Event(Event::End(TagEnd::Paragraph))));
        if wrapped {
            tokens.pop();
            tokens.remove(0);
        }
        tokens
    }

    /// Render a document. Takes the headings and warnings collected in
    /// `ctx` into the result.
    pub fn render(&self, tokens: &[Token], ctx: &mut RenderContext<'_>) -> RenderResult {
        let html = strip_comments(&self.render_fragment(tokens, ctx));
        RenderResult {
            html,
            toc: ctx.take_toc(),
            warnings: ctx.take_warnings(),
        }
    }

    /// Parse and render a one-line fragment.
    pub fn render_inline(&self, markdown: &str, ctx: &mut RenderContext<'_>) -> String {
        let tokens = self.parse_inline(markdown);
        self.render_fragment(&tokens, ctx)
    }

    /// Plain text of a token tree, for search.
    #[must_use]
    pub fn text(&self, tokens: &[Token]) -> String {
        text::extract(self, tokens)
    }

    pub(crate) fn render_fragment(&self, tokens: &[Token], ctx: &mut RenderContext<'_>) -> String {
        let mut writer = HtmlWriter::new(self);
        writer.write(tokens, ctx);
        writer.out
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("rules", &self.rules)
            .field("typesetters", &self.typesetters.len())
            .field("image_probe", &self.image_probe.is_some())
            .finish_non_exhaustive()
    }
}

/// Index of the token closing the one at `start`.
///
/// # Panics
///
/// Panics if the tree is unbalanced, which means the parser and the
/// renderer disagree.
pub(crate) fn matching_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        match token {
            Token::Event(Event::Start(_)) => depth += 1,
            Token::Event(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    panic!("unbalanced token tree: no end for token {start}");
}

pub(crate) fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Fenced info string or empty for indented blocks.
pub(crate) fn code_info<'t>(kind: &'t CodeBlockKind<'_>) -> &'t str {
    match kind {
        CodeBlockKind::Fenced(info) => info,
        CodeBlockKind::Indented => "",
    }
}

/// Concatenated text of the tokens between a code block's start and end.
pub(crate) fn code_content(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Event(Event::Text(text)) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}

struct HtmlWriter<'m> {
    md: &'m MarkdownRenderer,
    out: String,
    table: TableState,
    footnotes: HashMap<String, usize>,
}

impl<'m> HtmlWriter<'m> {
    fn new(md: &'m MarkdownRenderer) -> Self {
        Self {
            md,
            out: String::with_capacity(4096),
            table: TableState::default(),
            footnotes: HashMap::new(),
        }
    }

    fn write(&mut self, tokens: &[Token], ctx: &mut RenderContext<'_>) {
        let md = self.md;
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Event(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                })) => {
                    let end = matching_end(tokens, i);
                    let mut extra = Attrs::new();
                    if let Some(id) = id {
                        extra.set("id", id.as_ref());
                    }
                    for class in classes {
                        extra.add_class(class);
                    }
                    for (key, value) in attrs {
                        extra.set(key.as_ref(), value.as_deref().unwrap_or("true"));
                    }
                    let html = plugins::heading::render(
                        md,
                        &tokens[i + 1..end],
                        heading_level(*level),
                        &extra,
                        ctx,
                    );
                    self.out.push_str(&html);
                    i = end;
                }
                Token::Event(Event::Start(Tag::CodeBlock(kind))) => {
                    let end = matching_end(tokens, i);
                    let content = code_content(&tokens[i + 1..end]);
                    let html = plugins::code::block(md, code_info(kind), &content, ctx);
                    self.out.push_str(&html);
                    i = end;
                }
                Token::Event(Event::Start(Tag::Image {
                    dest_url, title, ..
                })) => {
                    let end = matching_end(tokens, i);
                    let html = plugins::image::render(md, dest_url, title, &tokens[i + 1..end], ctx);
                    self.out.push_str(&html);
                    i = end;
                }
                Token::Event(event) => self.event(event, ctx),
                Token::Rule(token) => match md.rules.get(&token.rule) {
                    Some(rule) => {
                        let html = rule.render(token, ctx);
                        self.out.push_str(&html);
                    }
                    None => self.out.push_str(&escape_html(&token.content)),
                },
                Token::Code { content, attrs } => {
                    self.out
                        .push_str(&plugins::code::tagged_inline(md, content, attrs));
                }
                Token::ComponentOpen { name, attrs } => {
                    let html = plugins::component::open(md, name, attrs, ctx);
                    self.out.push_str(&html);
                }
                Token::ComponentClose { name } => {
                    self.out.push_str(&plugins::component::close(name));
                }
                Token::Component { name, attrs } => {
                    let html = plugins::component::shorthand(md, name, attrs, ctx);
                    self.out.push_str(&html);
                }
                Token::SpanOpen(attrs) => {
                    write!(self.out, "<span{}>", attrs.to_html()).unwrap();
                }
                Token::SpanClose => self.out.push_str("</span>"),
            }
            i += 1;
        }
    }

    fn event(&mut self, event: &Event<'static>, ctx: &mut RenderContext<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag, ctx),
            Event::End(tag) => self.end_tag(*tag),
            Event::Text(text) | Event::InlineMath(text) | Event::DisplayMath(text) => {
                self.out.push_str(&escape_html(text));
            }
            Event::Code(code) => self.out.push_str(&plugins::code::inline(code, ctx)),
            Event::Html(html) | Event::InlineHtml(html) => self.out.push_str(html),
            Event::FootnoteReference(label) => {
                let n = self.footnote_number(label);
                write!(
                    self.out,
                    r##"<sup class="footnote-reference"><a href="#fn-{}">{n}</a></sup>"##,
                    escape_html(label)
                )
                .unwrap();
            }
            Event::SoftBreak => self.out.push('\n'),
            Event::HardBreak => self.out.push_str("<br />\n"),
            Event::Rule => self.out.push_str("<hr />\n"),
            Event::TaskListMarker(true) => {
                self.out.push_str(r#"<input type="checkbox" checked disabled /> "#);
            }
            Event::TaskListMarker(false) => {
                self.out.push_str(r#"<input type="checkbox" disabled /> "#);
            }
        }
    }

    fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_owned()).or_insert(next)
    }

    fn start_tag(&mut self, tag: &Tag<'static>, ctx: &RenderContext<'_>) {
        match tag {
            Tag::Paragraph => self.out.push_str("<p>"),
            Tag::BlockQuote(_) => self.out.push_str("<blockquote>\n"),
            Tag::List(Some(1)) => self.out.push_str("<ol>\n"),
            Tag::List(Some(start)) => write!(self.out, "<ol start=\"{start}\">\n").unwrap(),
            Tag::List(None) => self.out.push_str("<ul>\n"),
            Tag::Item => self.out.push_str("<li>"),
            Tag::FootnoteDefinition(label) => {
                let n = self.footnote_number(label);
                write!(
                    self.out,
                    r#"<div class="footnote-definition" id="fn-{}"><sup class="footnote-definition-label">{n}</sup>"#,
                    escape_html(label)
                )
                .unwrap();
            }
            Tag::DefinitionList => self.out.push_str("<dl>\n"),
            Tag::DefinitionListTitle => self.out.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.out.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments.clone());
                self.out.push_str("<table>\n");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.out.push_str("<thead>\n<tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.out.push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.table.is_in_head() { "th" } else { "td" };
                write!(self.out, "<{cell}{}>", self.table.alignment_style()).unwrap();
            }
            Tag::Emphasis => self.out.push_str("<em>"),
            Tag::Strong => self.out.push_str("<strong>"),
            Tag::Strikethrough => self.out.push_str("<s>"),
            Tag::Superscript => self.out.push_str("<sup>"),
            Tag::Subscript => self.out.push_str("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = match link_type {
                    LinkType::Email => format!("mailto:{dest_url}"),
                    _ => resolve_link(dest_url, ctx.page().link_base()),
                };
                write!(self.out, r#"<a href="{}""#, escape_html(&href)).unwrap();
                if !title.is_empty() {
                    write!(self.out, r#" title="{}""#, escape_html(title)).unwrap();
                }
                self.out.push('>');
            }
            // Handled with their content in `write`.
            Tag::Heading { .. }
            | Tag::CodeBlock(_)
            | Tag::Image { .. }
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.out.push_str("</p>\n"),
            TagEnd::BlockQuote(_) => self.out.push_str("</blockquote>\n"),
            TagEnd::List(true) => self.out.push_str("</ol>\n"),
            TagEnd::List(false) => self.out.push_str("</ul>\n"),
            TagEnd::Item => self.out.push_str("</li>\n"),
            TagEnd::FootnoteDefinition => self.out.push_str("</div>\n"),
            TagEnd::DefinitionList => self.out.push_str("</dl>\n"),
            TagEnd::DefinitionListTitle => self.out.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.out.push_str("</dd>\n"),
            TagEnd::Table => self.out.push_str("</tbody>\n</table>\n"),
            TagEnd::TableHead => {
                self.table.end_head();
                self.out.push_str("</tr>\n</thead>\n<tbody>\n");
            }
            TagEnd::TableRow => self.out.push_str("</tr>\n"),
            TagEnd::TableCell => {
                let cell = if self.table.is_in_head() { "th" } else { "td" };
                write!(self.out, "</{cell}>").unwrap();
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.out.push_str("</em>"),
            TagEnd::Strong => self.out.push_str("</strong>"),
            TagEnd::Strikethrough => self.out.push_str("</s>"),
            TagEnd::Superscript => self.out.push_str("</sup>"),
            TagEnd::Subscript => self.out.push_str("</sub>"),
            TagEnd::Link => self.out.push_str("</a>"),
            TagEnd::Heading(_)
            | TagEnd::CodeBlock
            | TagEnd::Image
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_) => {}
        }
    }
}
