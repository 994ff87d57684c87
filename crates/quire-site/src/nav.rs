//! Site configuration and navigation.
//!
//! `docs/config.yml` holds the navigation shape and category icons:
//!
//! ```yaml
//! nav:
//!   - cs:
//!       - ads:
//!           - avl-tree
//!       - cheatsheet
//!   - about
//! icon:
//!   cs: laptop-code
//! ```
//!
//! A string is a leaf naming a post; a single-key mapping is a branch naming
//! a directory whose `index.md` supplies the title.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unresolved navigation node as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawNavNode {
    Leaf(String),
    Branch(BTreeMap<String, Vec<RawNavNode>>),
}

/// Site configuration as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawSiteConfig {
    #[serde(default)]
    pub nav: Vec<RawNavNode>,
    #[serde(default)]
    pub icon: BTreeMap<String, String>,
}

impl RawSiteConfig {
    /// Parse the YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns the YAML error for malformed input.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Resolved navigation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub title: String,
    /// Directory or post name, e.g. `cs`.
    pub name: String,
    #[serde(rename = "link")]
    pub url: String,
    pub children: Vec<NavNode>,
}

/// Resolved site configuration, written to `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub nav: Vec<NavNode>,
    pub icon: BTreeMap<String, String>,
}

/// Error resolving navigation.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// A node names a document that does not exist.
    #[error("navigation references {pathname}, which is not a document")]
    MissingEntry { pathname: String },
    /// A branch mapping must have exactly one key.
    #[error("navigation branch under {path:?} must have exactly one key, found {count}")]
    InvalidBranch { path: String, count: usize },
}

/// Resolve `raw` depth-first, looking titles up by pathname.
///
/// # Errors
///
/// Returns [`NavError::MissingEntry`] for the first node without a document.
pub fn resolve_nav<'t>(
    raw: &[RawNavNode],
    title_of: impl Fn(&str) -> Option<&'t str>,
) -> Result<Vec<NavNode>, NavError> {
    raw.iter().map(|node| resolve_node(node, "", &title_of)).collect()
}

fn resolve_node<'t>(
    node: &RawNavNode,
    parent: &str,
    title_of: &impl Fn(&str) -> Option<&'t str>,
) -> Result<NavNode, NavError> {
    let lookup = |pathname: String| {
        title_of(&pathname)
            .map(str::to_owned)
            .ok_or(NavError::MissingEntry { pathname })
    };

    match node {
        RawNavNode::Leaf(name) => {
            let url = format!("{parent}/{name}");
            Ok(NavNode {
                title: lookup(format!("docs{url}.md"))?,
                name: name.clone(),
                url,
                children: Vec::new(),
            })
        }
        RawNavNode::Branch(map) => {
            let mut iter = map.iter();
            let (Some((name, children)), None) = (iter.next(), iter.next()) else {
                return Err(NavError::InvalidBranch {
                    path: parent.to_owned(),
                    count: map.len(),
                });
            };
            let url = format!("{parent}/{name}");
            let title = lookup(format!("docs{url}/index.md"))?;
            let children = children
                .iter()
                .map(|child| resolve_node(child, &url, title_of))
                .collect::<Result<_, _>>()?;
            Ok(NavNode {
                title,
                name: name.clone(),
                url,
                children,
            })
        }
    }
}
