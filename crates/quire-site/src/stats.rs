//! Site-wide statistics slots.
//!
//! Markup may contain the placeholders below; they are replaced at emission
//! time with values computed over every document.
//!
//! | Slot | Value |
//! |---|---|
//! | `@PAGE_COUNT` | number of documents, not counting the root |
//! | `@WORD_COUNT` | total words in plain text; each CJK character is a word |
//! | `@LAST_UPDATE` | `<time>` element for the newest `updated` timestamp |
//! | `@RECENT_UPDATES` | links to the three most recently updated posts |

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Utc};

use crate::entry::Document;
use crate::pathname::EntryKind;

const RECENT_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recent {
    url: String,
    title: String,
    updated: String,
}

/// Statistics over one snapshot of the site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    page_count: usize,
    word_count: usize,
    last_update: Option<String>,
    recent: Vec<Recent>,
}

fn instant(timestamp: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(timestamp).ok()
}

/// Words in `text`. CJK characters count individually; any other run of
/// alphanumeric characters is one word.
#[must_use]
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() || (c == '\'' && in_word) {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'   // kana
        | '\u{3400}'..='\u{4dbf}' // extension A
        | '\u{4e00}'..='\u{9fff}' // unified ideographs
        | '\u{ac00}'..='\u{d7af}' // hangul syllables
        | '\u{f900}'..='\u{faff}' // compatibility ideographs
    )
}

impl Stats {
    /// Compute every slot value from `docs`.
    #[must_use]
    pub fn collect(docs: &[Document<'_>]) -> Self {
        let word_count = docs.iter().map(|doc| count_words(doc.text)).sum();

        let last_update = docs
            .iter()
            .map(|doc| doc.entry.time().updated.as_str())
            .max_by_key(|updated| instant(updated))
            .map(str::to_owned);

        let mut posts: Vec<_> = docs
            .iter()
            .filter(|doc| doc.entry.kind() == EntryKind::Post)
            .collect();
        // Stable: equal timestamps keep scan order.
        posts.sort_by_key(|doc| std::cmp::Reverse(instant(&doc.entry.time().updated)));
        let recent = posts
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|doc| Recent {
                url: doc.entry.url().to_owned(),
                title: doc.title().to_owned(),
                updated: doc.entry.time().updated.clone(),
            })
            .collect();

        Self {
            page_count: docs.len().saturating_sub(1),
            word_count,
            last_update,
            recent,
        }
    }

    fn last_update_html(&self) -> String {
        let Some(last) = &self.last_update else {
            return String::new();
        };
        let label = instant(last).map_or_else(
            || last.clone(),
            |t| t.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
        );
        format!(r#"<time datetime="{last}">{label}</time>"#)
    }

    fn recent_updates_html(&self) -> String {
        let mut out = String::from("\n");
        for (i, recent) in self.recent.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let when = instant(&recent.updated).map_or_else(
                || recent.updated.clone(),
                |t| t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            write!(
                out,
                r#"<p><Anchor href="{}" title="Updated {when}">{}</Anchor></p>"#,
                recent.url, recent.title
            )
            .unwrap();
        }
        out.push('\n');
        out
    }

    /// Replace every slot occurring in `html`.
    #[must_use]
    pub fn inject(&self, html: &str) -> String {
        if !html.contains('@') {
            return html.to_owned();
        }
        let mut out = html
            .replace("@PAGE_COUNT", &self.page_count.to_string())
            .replace("@WORD_COUNT", &self.word_count.to_string());
        if out.contains("@LAST_UPDATE") {
            out = out.replace("@LAST_UPDATE", &self.last_update_html());
        }
        if out.contains("@RECENT_UPDATES") {
            out = out.replace("@RECENT_UPDATES", &self.recent_updates_html());
        }
        out
    }
}
