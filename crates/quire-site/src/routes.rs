//! Route table.

use std::collections::HashMap;

use quire_renderer::TocEntry;
use serde::Serialize;

use crate::entry::Document;
use crate::front_matter::FrontMatter;
use crate::pathname::EntryKind;

/// Path of the catch-all route served by the 404 document.
pub const NOT_FOUND_PATH: &str = "/:pathMatch(.*)";

/// Breadcrumb link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreadcrumbItem {
    pub title: String,
    pub link: String,
}

/// Route metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMeta {
    pub pathname: String,
    pub category: String,
    pub attr: FrontMatter,
    pub toc: Vec<TocEntry>,
    pub created: String,
    pub updated: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub breadcrumb: Vec<BreadcrumbItem>,
}

/// One route record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    pub path: String,
    /// Import source of the output unit.
    pub component: String,
    pub meta: RouteMeta,
}

/// Error building the route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("breadcrumb of {pathname} references {url}, which is not a document")]
    UnresolvedBreadcrumb { pathname: String, url: String },
}

/// Build one record per document, with the 404 route last.
///
/// `component_of` maps a document to the import source of its output unit.
///
/// # Errors
///
/// Returns [`RouteError::UnresolvedBreadcrumb`] when an ancestor url has no
/// document.
pub fn build_routes(
    docs: &[Document<'_>],
    component_of: impl Fn(&Document<'_>) -> String,
) -> Result<Vec<RouteRecord>, RouteError> {
    let titles: HashMap<&str, &str> = docs
        .iter()
        .map(|doc| (doc.entry.url(), doc.title()))
        .collect();

    let mut routes = Vec::with_capacity(docs.len());
    let mut not_found = None;

    for doc in docs {
        let entry = doc.entry;
        let breadcrumb = entry
            .back_urls()
            .into_iter()
            .map(|url| match titles.get(url.as_str()) {
                Some(title) => Ok(BreadcrumbItem {
                    title: (*title).to_owned(),
                    link: url,
                }),
                None => Err(RouteError::UnresolvedBreadcrumb {
                    pathname: entry.pathname().to_string(),
                    url,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let kind = entry.kind();
        let record = RouteRecord {
            path: if kind == EntryKind::NotFound {
                NOT_FOUND_PATH.to_owned()
            } else {
                entry.url().to_owned()
            },
            component: component_of(doc),
            meta: RouteMeta {
                pathname: entry.pathname().to_string(),
                category: entry.category(),
                attr: doc.front_matter.clone(),
                toc: doc.toc.to_vec(),
                created: entry.time().created.clone(),
                updated: entry.time().updated.clone(),
                kind,
                breadcrumb,
            },
        };

        if kind == EntryKind::NotFound {
            not_found = Some(record);
        } else {
            routes.push(record);
        }
    }

    routes.extend(not_found);
    Ok(routes)
}
