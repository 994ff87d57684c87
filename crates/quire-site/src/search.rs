//! Full-text search index.
//!
//! The index is rebuilt from scratch on every change: field norms depend on
//! the whole record set. [`SearchBundle`] is what gets written to
//! `search.json`; [`Searcher`] rebuilds the matcher from it at query time.
//!
//! Matching is approximate substring matching. The score of a field is the
//! edit distance between the query and its best-matching window of the field
//! divided by the query length. Location within the field does not matter.

use serde::{Deserialize, Serialize};

use crate::entry::Document;
use crate::pathname::EntryKind;

/// Indexed fields, in record order.
pub const SEARCH_KEYS: [&str; 2] = ["title", "content"];

/// Highest field score that still counts as a match.
pub const SEARCH_THRESHOLD: f64 = 0.4;

/// Record handed to the search consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub title: String,
    /// Plain text of the document.
    pub content: String,
    pub link: String,
    /// Root or directory index.
    pub is_index: bool,
}

/// Matcher options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub keys: Vec<String>,
    pub include_matches: bool,
    pub ignore_location: bool,
    pub threshold: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            keys: SEARCH_KEYS.iter().map(|k| (*k).to_owned()).collect(),
            include_matches: true,
            ignore_location: true,
            threshold: SEARCH_THRESHOLD,
        }
    }
}

/// Precomputed field: lower-cased value and length norm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub v: String,
    pub n: f64,
}

/// Precomputed fields of record `i`, in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub i: usize,
    pub fields: Vec<IndexField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub keys: Vec<String>,
    pub records: Vec<IndexRecord>,
}

/// Options, prebuilt index and raw records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBundle {
    pub options: SearchOptions,
    pub index: SearchIndex,
    pub records: Vec<SearchTarget>,
}

/// Field-length norm: `1/sqrt(tokens)`, rounded to three decimals.
fn norm(value: &str) -> f64 {
    let tokens = value.split(' ').filter(|t| !t.is_empty()).count();
    if tokens == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = 1.0 / (tokens as f64).sqrt();
    (n * 1000.0).round() / 1000.0
}

impl SearchBundle {
    /// Index `records`.
    #[must_use]
    pub fn new(records: Vec<SearchTarget>) -> Self {
        let options = SearchOptions::default();
        let index = SearchIndex {
            keys: options.keys.clone(),
            records: records
                .iter()
                .enumerate()
                .map(|(i, record)| IndexRecord {
                    i,
                    fields: [&record.title, &record.content]
                        .into_iter()
                        .map(|value| {
                            let v = value.to_lowercase();
                            IndexField { n: norm(&v), v }
                        })
                        .collect(),
                })
                .collect(),
        };
        Self {
            options,
            index,
            records,
        }
    }
}

/// Build the bundle for every document except the 404 page.
#[must_use]
pub fn build_search(docs: &[Document<'_>]) -> SearchBundle {
    let records = docs
        .iter()
        .filter(|doc| doc.entry.kind() != EntryKind::NotFound)
        .map(|doc| SearchTarget {
            title: doc.title().to_owned(),
            content: doc.text.to_owned(),
            link: doc.entry.url().to_owned(),
            is_index: matches!(doc.entry.kind(), EntryKind::Index | EntryKind::Root),
        })
        .collect();
    SearchBundle::new(records)
}

/// Matched character range (inclusive) in one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub key: String,
    pub indices: Vec<(usize, usize)>,
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub item: &'a SearchTarget,
    /// Position of the record in the bundle.
    pub refindex: usize,
    /// 0 is a perfect match, 1 a complete mismatch.
    pub score: f64,
    pub matches: Vec<FieldMatch>,
}

/// Query-time matcher over a [`SearchBundle`].
#[derive(Debug, Clone)]
pub struct Searcher {
    bundle: SearchBundle,
}

impl Searcher {
    #[must_use]
    pub fn new(bundle: SearchBundle) -> Self {
        Self { bundle }
    }

    /// Parse a serialized bundle.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Records matching `query`, best first. An empty query returns every
    /// record in index order.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let records = &self.bundle.records;
        if query.is_empty() {
            return records
                .iter()
                .enumerate()
                .map(|(refindex, item)| SearchHit {
                    item,
                    refindex,
                    score: 0.0,
                    matches: Vec::new(),
                })
                .collect();
        }

        let pattern: Vec<char> = query.to_lowercase().chars().collect();
        let threshold = self.bundle.options.threshold;
        let keys = &self.bundle.index.keys;

        let mut hits: Vec<SearchHit<'_>> = self
            .bundle
            .index
            .records
            .iter()
            .filter_map(|record| {
                let item = records.get(record.i)?;
                let mut total = 1.0;
                let mut matches = Vec::new();

                for (key, field) in keys.iter().zip(&record.fields) {
                    let text: Vec<char> = field.v.chars().collect();
                    let Some(window) = best_window(&pattern, &text) else {
                        continue;
                    };
                    #[allow(clippy::cast_precision_loss)]
                    let score = window.distance as f64 / pattern.len() as f64;
                    if score > threshold {
                        continue;
                    }
                    total *= score.max(f64::EPSILON).powf(field.n);
                    matches.push(FieldMatch {
                        key: key.clone(),
                        indices: vec![(window.start, window.end)],
                    });
                }

                (!matches.is_empty()).then_some(SearchHit {
                    item,
                    refindex: record.i,
                    score: total,
                    matches,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    distance: usize,
    start: usize,
    /// Inclusive.
    end: usize,
}

/// Best approximate occurrence of `pattern` in `text`.
///
/// Edit distance where the match may start and end anywhere in `text`.
/// Ties prefer the earliest end. `None` for an empty text.
///
/// Walks `text` one column at a time, keeping one column of distances and
/// the text position each cell's alignment started at, so memory is
/// O(pattern) regardless of the field length.
fn best_window(pattern: &[char], text: &[char]) -> Option<Window> {
    let m = pattern.len();
    if text.is_empty() || m == 0 {
        return None;
    }

    // (distance, start) for pattern[..i] against the best window ending here.
    let mut prev: Vec<(usize, usize)> = (0..=m).map(|i| (i, 0)).collect();
    let mut cur = prev.clone();
    let mut best: Option<Window> = None;

    for (j, &t) in text.iter().enumerate() {
        cur[0] = (0, j + 1);
        for i in 1..=m {
            let cost = usize::from(pattern[i - 1] != t);
            let diag = (prev[i - 1].0 + cost, prev[i - 1].1);
            let up = (cur[i - 1].0 + 1, cur[i - 1].1);
            let left = (prev[i].0 + 1, prev[i].1);
            cur[i] = if diag.0 <= up.0 && diag.0 <= left.0 {
                diag
            } else if up.0 <= left.0 {
                up
            } else {
                left
            };
        }

        let (distance, start) = cur[m];
        if best.is_none_or(|w| distance < w.distance) {
            best = Some(Window {
                distance,
                start: start.min(j),
                end: j,
            });
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn target(title: &str, content: &str, link: &str) -> SearchTarget {
        SearchTarget {
            title: title.to_owned(),
            content: content.to_owned(),
            link: link.to_owned(),
            is_index: false,
        }
    }

    fn bundle() -> SearchBundle {
        SearchBundle::new(vec![
            target("AVL Tree", "A self-balancing binary search tree.", "/cs/ads/avl-tree"),
            target("Red-Black Tree", "Another balanced tree with colours.", "/cs/ads/rbt"),
            target("French", "Bonjour tout le monde.", "/misc/french"),
        ])
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm("one"), 1.0);
        assert_eq!(norm("two words"), 0.707);
        assert_eq!(norm("a  b c"), 0.577);
        assert_eq!(norm(""), 1.0);
    }

    #[test]
    fn test_index_is_lowercased() {
        let bundle = bundle();
        assert_eq!(bundle.index.keys, vec!["title", "content"]);
        assert_eq!(bundle.index.records[0].i, 0);
        assert_eq!(bundle.index.records[0].fields[0].v, "avl tree");
        assert_eq!(bundle.index.records[0].fields[0].n, 0.707);
    }

    #[test]
    fn test_best_window_exact_and_fuzzy() {
        let w = best_window(&chars("tree"), &chars("an avl tree")).unwrap();
        assert_eq!(w, Window { distance: 0, start: 7, end: 10 });

        let w = best_window(&chars("balancng"), &chars("self-balancing")).unwrap();
        assert_eq!(w, Window { distance: 1, start: 5, end: 13 });

        assert!(best_window(&chars("x"), &[]).is_none());
    }

    #[test]
    fn test_best_window_on_long_field() {
        let mut text = "lorem ipsum ".repeat(20_000);
        let offset = text.chars().count();
        text.push_str("splay tree rotation");

        let w = best_window(&chars("rotaton"), &chars(&text)).unwrap();

        assert_eq!(
            w,
            Window {
                distance: 1,
                start: offset + 11,
                end: offset + 18,
            }
        );
    }

    #[test]
    fn test_search_orders_by_score() {
        let searcher = Searcher::new(bundle());

        let hits = searcher.search("avl");

        assert_eq!(hits[0].item.link, "/cs/ads/avl-tree");
        assert_eq!(hits[0].matches[0].key, "title");
        assert_eq!(hits[0].matches[0].indices, vec![(0, 2)]);
        assert!(hits.iter().all(|h| h.item.link != "/misc/french"));
    }

    #[test]
    fn test_search_is_case_insensitive_and_fuzzy() {
        let searcher = Searcher::new(bundle());

        let hits = searcher.search("BALANCD");

        let links: Vec<_> = hits.iter().map(|h| h.item.link.as_str()).collect();
        assert!(links.contains(&"/cs/ads/avl-tree"));
        assert!(links.contains(&"/cs/ads/rbt"));
    }

    #[test]
    fn test_search_rejects_beyond_threshold() {
        let searcher = Searcher::new(bundle());
        assert!(searcher.search("zzzzzz").is_empty());
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let searcher = Searcher::new(bundle());
        let hits = searcher.search("");
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].refindex, 2);
    }

    #[test]
    fn test_bundle_json_round_trip() {
        let json = serde_json::to_string(&bundle()).unwrap();
        assert!(json.contains(r#""threshold":0.4"#));
        assert!(json.contains(r#""include_matches":true"#));

        let searcher = Searcher::from_json(&json).unwrap();
        assert_eq!(searcher.search("french")[0].item.title, "French");
    }
}
