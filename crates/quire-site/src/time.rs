//! Creation and update timestamps.
//!
//! Timestamps are RFC 3339 strings. [`GitTimeSource`] reads them from
//! version control history; an [`OverrideTable`] restores times that a
//! history rewrite lost.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last update time of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTime {
    pub created: String,
    pub updated: String,
}

impl EntryTime {
    /// Both timestamps set to the current time.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            created: now.clone(),
            updated: now,
        }
    }
}

/// Provider of entry timestamps.
pub trait TimeSource: Send + Sync {
    /// Timestamps for `pathname`. Providers fall back to [`EntryTime::now`]
    /// when no data is available.
    fn time_of(&self, pathname: &str) -> EntryTime;
}

/// Error loading an override table.
#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid override table: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid cutoff {value}: {source}")]
    Cutoff {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One row of an override table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeOverride {
    pub pathname: String,
    pub created: String,
    pub updated: String,
}

/// Static timestamps keyed by pathname.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rows: Vec<TimeOverride>,
}

impl OverrideTable {
    /// Parse a YAML list of `{pathname, created, updated}`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Yaml`] for malformed input.
    pub fn from_yaml(content: &str) -> Result<Self, TimeError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            rows: serde_yaml::from_str(content)?,
        })
    }

    /// Load a table from a file.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TimeError> {
        let content = std::fs::read_to_string(path).map_err(|source| TimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    #[must_use]
    pub fn get(&self, pathname: &str) -> Option<&TimeOverride> {
        self.rows.iter().find(|row| row.pathname == pathname)
    }
}

/// Parse an RFC 3339 cutoff.
///
/// # Errors
///
/// Returns [`TimeError::Cutoff`] if `value` is not RFC 3339.
pub fn parse_cutoff(value: &str) -> Result<DateTime<FixedOffset>, TimeError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| TimeError::Cutoff {
        value: value.to_owned(),
        source,
    })
}

/// Combine version control history with an override table.
///
/// `history` holds commit dates newest first. Without commits both times are
/// now. The override's `created` always wins; its `updated` wins only when
/// the latest commit precedes `cutoff`.
#[must_use]
pub fn resolve(
    history: &[String],
    row: Option<&TimeOverride>,
    cutoff: &DateTime<FixedOffset>,
) -> EntryTime {
    let (Some(latest), Some(first)) = (history.first(), history.last()) else {
        return EntryTime::now();
    };

    let created = row.map_or_else(|| first.clone(), |r| r.created.clone());
    let before_cutoff = DateTime::parse_from_rfc3339(latest).is_ok_and(|t| t < *cutoff);
    let updated = match row {
        Some(r) if before_cutoff => r.updated.clone(),
        _ => latest.clone(),
    };

    EntryTime { created, updated }
}

/// Timestamps from `git log --follow`.
#[derive(Debug, Clone)]
pub struct GitTimeSource {
    root: PathBuf,
    overrides: OverrideTable,
    cutoff: DateTime<FixedOffset>,
}

impl GitTimeSource {
    /// Query history of the repository containing `root`.
    #[must_use]
    pub fn new(root: PathBuf, overrides: OverrideTable, cutoff: DateTime<FixedOffset>) -> Self {
        Self {
            root,
            overrides,
            cutoff,
        }
    }

    /// Author dates of every commit touching `pathname`, newest first.
    fn history(&self, pathname: &str) -> Vec<String> {
        let output = Command::new("git")
            .args(["log", "--follow", "--format=%aI", "--", pathname])
            .current_dir(&self.root)
            .output();

        match output {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            Ok(output) => {
                tracing::debug!(
                    path = pathname,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "git log failed"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::debug!(path = pathname, error = %e, "git unavailable");
                Vec::new()
            }
        }
    }
}

impl TimeSource for GitTimeSource {
    fn time_of(&self, pathname: &str) -> EntryTime {
        let history = self.history(pathname);
        resolve(&history, self.overrides.get(pathname), &self.cutoff)
    }
}

/// Timestamps from an override table alone, for projects outside version
/// control. Unknown pathnames get the current time.
#[derive(Debug, Clone, Default)]
pub struct StaticTimeSource {
    overrides: OverrideTable,
}

impl StaticTimeSource {
    #[must_use]
    pub fn new(overrides: OverrideTable) -> Self {
        Self { overrides }
    }
}

impl TimeSource for StaticTimeSource {
    fn time_of(&self, pathname: &str) -> EntryTime {
        self.overrides.get(pathname).map_or_else(EntryTime::now, |row| EntryTime {
            created: row.created.clone(),
            updated: row.updated.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CUTOFF: &str = "2025-01-24T13:17:33.598Z";

    fn row() -> TimeOverride {
        TimeOverride {
            pathname: "docs/cs/ads/avl-tree.md".to_owned(),
            created: "2024-09-11T13:51:55+08:00".to_owned(),
            updated: "2024-09-19T17:10:17+08:00".to_owned(),
        }
    }

    fn history(dates: &[&str]) -> Vec<String> {
        dates.iter().map(|d| (*d).to_owned()).collect()
    }

    #[test]
    fn test_no_history_is_now() {
        let cutoff = parse_cutoff(CUTOFF).unwrap();
        let time = resolve(&[], Some(&row()), &cutoff);
        assert_eq!(time.created, time.updated);
        assert!(DateTime::parse_from_rfc3339(&time.created).is_ok());
    }

    #[test]
    fn test_history_without_override() {
        let cutoff = parse_cutoff(CUTOFF).unwrap();
        let time = resolve(
            &history(&["2025-03-01T10:00:00+00:00", "2025-02-01T10:00:00+00:00"]),
            None,
            &cutoff,
        );
        assert_eq!(
            time,
            EntryTime {
                created: "2025-02-01T10:00:00+00:00".to_owned(),
                updated: "2025-03-01T10:00:00+00:00".to_owned(),
            }
        );
    }

    #[test]
    fn test_override_before_cutoff_wins_both() {
        let cutoff = parse_cutoff(CUTOFF).unwrap();
        let time = resolve(
            &history(&["2025-01-24T10:00:00+00:00", "2025-01-20T10:00:00+00:00"]),
            Some(&row()),
            &cutoff,
        );
        assert_eq!(time.created, "2024-09-11T13:51:55+08:00");
        assert_eq!(time.updated, "2024-09-19T17:10:17+08:00");
    }

    #[test]
    fn test_override_after_cutoff_keeps_git_update() {
        let cutoff = parse_cutoff(CUTOFF).unwrap();
        let time = resolve(
            &history(&["2025-06-01T10:00:00+00:00", "2025-01-20T10:00:00+00:00"]),
            Some(&row()),
            &cutoff,
        );
        assert_eq!(time.created, "2024-09-11T13:51:55+08:00");
        assert_eq!(time.updated, "2025-06-01T10:00:00+00:00");
    }

    #[test]
    fn test_override_table_yaml() {
        let table = OverrideTable::from_yaml(
            "- pathname: docs/a.md\n  created: 2024-01-01T00:00:00Z\n  updated: 2024-02-01T00:00:00Z\n",
        )
        .unwrap();
        assert_eq!(table.get("docs/a.md").unwrap().updated, "2024-02-01T00:00:00Z");
        assert!(table.get("docs/b.md").is_none());
        assert!(OverrideTable::from_yaml("").unwrap().get("docs/a.md").is_none());
        assert!(OverrideTable::from_yaml("not: [a list").is_err());
    }

    #[test]
    fn test_override_table_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverrideTable::load(&dir.path().join("missing.yml")).unwrap_err();
        assert!(matches!(err, TimeError::Io { .. }));
    }

    #[test]
    fn test_static_source() {
        let table = OverrideTable { rows: vec![row()] };
        let source = StaticTimeSource::new(table);
        assert_eq!(
            source.time_of("docs/cs/ads/avl-tree.md").created,
            "2024-09-11T13:51:55+08:00"
        );
        let unknown = source.time_of("docs/other.md");
        assert_eq!(unknown.created, unknown.updated);
    }

    #[test]
    fn test_git_source_outside_repository_falls_back_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let source = GitTimeSource::new(
            dir.path().to_path_buf(),
            OverrideTable::default(),
            parse_cutoff(CUTOFF).unwrap(),
        );
        let time = source.time_of("docs/index.md");
        assert_eq!(time.created, time.updated);
    }

    #[test]
    fn test_invalid_cutoff() {
        assert!(matches!(parse_cutoff("yesterday"), Err(TimeError::Cutoff { .. })));
    }
}
