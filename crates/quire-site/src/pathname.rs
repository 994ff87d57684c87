//! Document identity.
//!
//! Every derived location of a document is a pure function of its pathname:
//!
//! | pathname                  | url                | kind  | category | breadcrumb                  |
//! |---------------------------|--------------------|-------|----------|-----------------------------|
//! | `docs/cs/ads/avl-tree.md` | `/cs/ads/avl-tree` | post  | `cs`     | `/`, `/cs`, `/cs/ads`       |
//! | `docs/cs/index.md`        | `/cs`              | index | `cs`     | `/`                         |
//! | `docs/index.md`           | `/`                | root  |          |                             |
//! | `docs/404.md`             | `/404`             | 404   |          | `/`                         |

use std::fmt;

use serde::{Deserialize, Serialize};

const PREFIX: &str = "docs/";
const SUFFIX: &str = ".md";
const ROOT: &str = "docs/index.md";
const NOT_FOUND: &str = "docs/404.md";

/// Error returned for a pathname outside the document convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathnameError {
    #[error("{0}: pathname must start with `docs/`")]
    Prefix(String),
    #[error("{0}: pathname must end with `.md`")]
    Suffix(String),
    #[error("{0}: pathname has an empty stem")]
    EmptyStem(String),
    #[error("{0}: pathname has an empty, `.` or `..` segment")]
    Segment(String),
}

/// Kind of document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// `docs/index.md`.
    Root,
    /// Any other `index.md`.
    Index,
    /// `docs/404.md`.
    #[serde(rename = "404")]
    NotFound,
    Post,
}

/// Validated project-relative document path (`docs/<rel>.md`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Pathname(String);

impl Pathname {
    /// Validate a pathname.
    ///
    /// # Errors
    ///
    /// Returns [`PathnameError`] when the prefix or suffix is wrong, the stem
    /// is empty, or a segment is empty, `.` or `..`.
    pub fn parse(pathname: &str) -> Result<Self, PathnameError> {
        let rel = pathname
            .strip_prefix(PREFIX)
            .ok_or_else(|| PathnameError::Prefix(pathname.to_owned()))?;
        let stem = rel
            .strip_suffix(SUFFIX)
            .ok_or_else(|| PathnameError::Suffix(pathname.to_owned()))?;
        if stem.is_empty() || stem.ends_with('/') {
            return Err(PathnameError::EmptyStem(pathname.to_owned()));
        }
        if stem.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(PathnameError::Segment(pathname.to_owned()));
        }
        Ok(Self(pathname.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path below `docs/` without the extension.
    fn stem(&self) -> &str {
        &self.0[PREFIX.len()..self.0.len() - SUFFIX.len()]
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self.0.as_str() {
            ROOT => EntryKind::Root,
            NOT_FOUND => EntryKind::NotFound,
            p if p.ends_with("/index.md") => EntryKind::Index,
            _ => EntryKind::Post,
        }
    }

    /// Site URL. No trailing slash except for `/` itself.
    #[must_use]
    pub fn url(&self) -> String {
        let stem = self.stem();
        let dir = if stem == "index" {
            ""
        } else {
            stem.strip_suffix("/index").unwrap_or(stem)
        };
        format!("/{dir}")
    }

    /// Basename of the url: the post name, or the directory name for an index.
    /// Empty for the root.
    #[must_use]
    pub fn filename(&self) -> String {
        let url = self.url();
        url.rsplit('/').next().unwrap_or_default().to_owned()
    }

    /// Parent url. `/` for root and 404.
    #[must_use]
    pub fn back_url(&self) -> String {
        match self.kind() {
            EntryKind::Root | EntryKind::NotFound => "/".to_owned(),
            EntryKind::Index | EntryKind::Post => {
                let url = self.url();
                match url.rsplit_once('/') {
                    Some((parent, _)) if !parent.is_empty() => parent.to_owned(),
                    _ => "/".to_owned(),
                }
            }
        }
    }

    /// Ancestor urls from the root down to the parent. Empty for the root.
    #[must_use]
    pub fn back_urls(&self) -> Vec<String> {
        if self.kind() == EntryKind::Root {
            return Vec::new();
        }
        let url = self.url();
        let parts: Vec<&str> = url.split('/').collect();
        let mut urls = vec!["/".to_owned()];
        for i in 1..parts.len().saturating_sub(1) {
            urls.push(parts[..=i].join("/"));
        }
        urls
    }

    /// First url segment. Empty for root and 404.
    #[must_use]
    pub fn category(&self) -> String {
        match self.kind() {
            EntryKind::Root | EntryKind::NotFound => String::new(),
            EntryKind::Index | EntryKind::Post => self
                .url()
                .split('/')
                .nth(1)
                .unwrap_or_default()
                .to_owned(),
        }
    }

    /// Output unit location relative to the output directory (`posts/<rel>.vue`).
    #[must_use]
    pub fn post_pathname(&self) -> String {
        format!("posts/{}.vue", self.stem())
    }

    /// Output unit location without the extension, for imports (`posts/<rel>`).
    #[must_use]
    pub fn post_stem(&self) -> String {
        format!("posts/{}", self.stem())
    }
}

impl fmt::Display for Pathname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Pathname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Pathname {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
