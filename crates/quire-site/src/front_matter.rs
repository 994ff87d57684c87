//! YAML front matter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parsed front matter.
///
/// Unknown keys are kept in `extra` and serialized back flat, so they travel
/// with route metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    /// Whether to show comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<bool>,
    /// Whether to show creation and modification times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Error returned when front matter cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    /// The block is not valid YAML or lacks a required field.
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Split `raw` into the YAML block and the markdown body.
///
/// The block starts with a `---` line at the very beginning of the file and
/// ends at the next `---` or `...` line. Without one, the YAML is empty and
/// the body is the whole file.
#[must_use]
pub fn split(raw: &str) -> (&str, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return ("", raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return (&rest[..offset], &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    // Unterminated: not a front matter block.
    ("", raw)
}

/// Parse front matter and return it with the markdown body.
///
/// # Errors
///
/// Returns [`FrontMatterError`] for malformed YAML or a missing `title`.
pub fn parse(raw: &str) -> Result<(FrontMatter, &str), FrontMatterError> {
    let (yaml, body) = split(raw);
    let front_matter = if yaml.trim().is_empty() {
        // An empty block is an empty mapping, which then fails on `title`.
        serde_yaml::from_value(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()))?
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((front_matter, body))
}
