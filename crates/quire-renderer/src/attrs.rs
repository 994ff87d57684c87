//! Attribute group parsing.
//!
//! Parses the `{#id .class key="value" flag}` syntax that may follow inline
//! rules, bracketed spans, inline code and component markers.

use std::fmt::Write;

use crate::html::escape_html;

/// Ordered attribute list.
///
/// `#id` becomes an `id` attribute, `.class` tokens accumulate into a single
/// space-separated `class` attribute and a bare `flag` becomes `flag="true"`.
/// Attributes keep their first-seen position; setting an existing key
/// replaces its value in place.
///
/// # Example
///
/// ```
/// use quire_renderer::Attrs;
///
/// let attrs = Attrs::parse(r#"#tip .wide title="Read me" warning"#);
/// assert_eq!(attrs.id(), Some("tip"));
/// assert_eq!(attrs.get("class"), Some("wide"));
/// assert_eq!(attrs.get("title"), Some("Read me"));
/// assert_eq!(attrs.get("warning"), Some("true"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attrs {
    entries: Vec<(String, String)>,
}

impl Attrs {
    /// Empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the inside of an attribute group (without braces).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut attrs = Self::new();
        let mut remaining = input.trim();

        while !remaining.is_empty() {
            if let Some(rest) = remaining.strip_prefix('#') {
                let end = selector_end(rest);
                attrs.set("id", &rest[..end]);
                remaining = &rest[end..];
            } else if let Some(rest) = remaining.strip_prefix('.') {
                let end = selector_end(rest);
                attrs.add_class(&rest[..end]);
                remaining = &rest[end..];
            } else if let Some((key, value, rest)) = parse_key_value(remaining) {
                attrs.set(key, value);
                remaining = rest;
            } else {
                let end = remaining
                    .find(char::is_whitespace)
                    .unwrap_or(remaining.len());
                let word = &remaining[..end];
                if word.chars().all(is_name_char) {
                    attrs.set(word, "true");
                }
                remaining = &remaining[end..];
            }
            remaining = remaining.trim_start();
        }

        attrs
    }

    /// Value of an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    /// Classes from the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get("class").into_iter().flat_map(str::split_whitespace)
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Append a class.
    pub fn add_class(&mut self, class: &str) {
        if class.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(k, _)| k == "class") {
            Some((_, value)) => {
                value.push(' ');
                value.push_str(class);
            }
            None => self.entries.push(("class".to_owned(), class.to_owned())),
        }
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as HTML attributes, each preceded by a space.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            write!(out, r#" {key}="{}""#, escape_html(value)).unwrap();
        }
        out
    }
}

/// Find an attribute group at the start of `s`.
///
/// Returns the group's inner text and the byte length consumed including the
/// braces. Quoted values may contain `}`.
#[must_use]
pub fn leading_group(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix('{')?;
    let mut quote = None;
    for (i, c) in inner.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '\n') => return None,
            (None, '}') => return Some((&inner[..i], i + 2)),
            (None, _) => {}
        }
    }
    None
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '@')
}

fn selector_end(s: &str) -> usize {
    s.find(|c: char| c.is_whitespace() || c == '.' || c == '#')
        .unwrap_or(s.len())
}

/// Parse `key="value"`, `key='value'` or `key=value` at the start of `s`.
fn parse_key_value(s: &str) -> Option<(&str, &str, &str)> {
    let key_end = s.find(|c: char| !is_name_char(c))?;
    if key_end == 0 || !s[key_end..].starts_with('=') {
        return None;
    }
    let key = &s[..key_end];
    let after_eq = &s[key_end + 1..];

    if let Some(stripped) = after_eq.strip_prefix('"') {
        let end_quote = stripped.find('"')?;
        Some((key, &stripped[..end_quote], &stripped[end_quote + 1..]))
    } else if let Some(stripped) = after_eq.strip_prefix('\'') {
        let end_quote = stripped.find('\'')?;
        Some((key, &stripped[..end_quote], &stripped[end_quote + 1..]))
    } else {
        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
        Some((key, &after_eq[..end], &after_eq[end..]))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pairs(attrs: &Attrs) -> Vec<(&str, &str)> {
        attrs.iter().collect()
    }

    #[test]
    fn test_empty() {
        assert!(Attrs::parse("").is_empty());
        assert!(Attrs::parse("   ").is_empty());
    }

    #[test]
    fn test_id_and_classes() {
        let attrs = Attrs::parse("#my-id .foo .bar");
        assert_eq!(attrs.id(), Some("my-id"));
        assert_eq!(attrs.classes().collect::<Vec<_>>(), vec!["foo", "bar"]);
    }

    #[test]
    fn test_compact_selectors() {
        let attrs = Attrs::parse("#id.a.b");
        assert_eq!(pairs(&attrs), vec![("id", "id"), ("class", "a b")]);
    }

    #[test]
    fn test_quoted_and_unquoted_values() {
        let attrs = Attrs::parse(r#"title="Hello World" lang='en' width=560"#);
        assert_eq!(
            pairs(&attrs),
            vec![("title", "Hello World"), ("lang", "en"), ("width", "560")]
        );
    }

    #[test]
    fn test_bare_flag_is_true() {
        let attrs = Attrs::parse("warning always");
        assert_eq!(pairs(&attrs), vec![("warning", "true"), ("always", "true")]);
    }

    #[test]
    fn test_empty_quoted_value() {
        assert_eq!(Attrs::parse(r#"alt="""#).get("alt"), Some(""));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut attrs = Attrs::parse("a=1 b=2");
        attrs.set("a", "3");
        attrs.set("c", "4");
        assert_eq!(pairs(&attrs), vec![("a", "3"), ("b", "2"), ("c", "4")]);
    }

    #[test]
    fn test_remove() {
        let mut attrs = Attrs::parse("a=1 b=2");
        assert_eq!(attrs.remove("a"), Some("1".to_owned()));
        assert_eq!(attrs.remove("a"), None);
        assert_eq!(pairs(&attrs), vec![("b", "2")]);
    }

    #[test]
    fn test_to_html_escapes_values() {
        let attrs = Attrs::parse(r#"#x title='say "hi"'"#);
        assert_eq!(attrs.to_html(), r#" id="x" title="say &quot;hi&quot;""#);
    }

    #[test]
    fn test_leading_group() {
        assert_eq!(leading_group("{.a} rest"), Some((".a", 4)));
        assert_eq!(leading_group(r#"{t="}"}x"#), Some((r#"t="}""#, 7)));
        assert_eq!(leading_group("{unclosed"), None);
        assert_eq!(leading_group("{a\n}"), None);
        assert_eq!(leading_group("no"), None);
    }
}
