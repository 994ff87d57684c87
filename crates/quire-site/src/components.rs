//! Reusable markup components imported into every output unit.

use std::fmt::Write;
use std::path::PathBuf;

/// Enumerates `*.vue` files in the component directory once, until reset.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    dir: PathBuf,
    import_prefix: String,
    names: Option<Vec<String>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new(dir: PathBuf, import_prefix: impl Into<String>) -> Self {
        Self {
            dir,
            import_prefix: import_prefix.into(),
            names: None,
        }
    }

    /// Component names, sorted. A missing directory has no components.
    pub fn names(&mut self) -> &[String] {
        let names = match self.names.take() {
            Some(names) => names,
            None => self.enumerate(),
        };
        self.names.insert(names)
    }

    fn enumerate(&self) -> Vec<String> {
        let read = match std::fs::read_dir(&self.dir) {
            Ok(read) => read,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "no component directory");
                return Vec::new();
            }
        };
        let mut names: Vec<String> = read
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != "vue" {
                    return None;
                }
                path.file_stem()?.to_str().map(str::to_owned)
            })
            .collect();
        names.sort();
        tracing::debug!(dir = %self.dir.display(), count = names.len(), "enumerated components");
        names
    }

    /// Forget the enumeration; the next access reads the directory again.
    pub fn reset(&mut self) {
        self.names = None;
    }

    /// One import statement per component.
    pub fn imports(&mut self) -> String {
        let prefix = self.import_prefix.trim_end_matches('/').to_owned();
        let mut out = String::new();
        for name in self.names() {
            writeln!(out, r#"import {name} from "{prefix}/{name}.vue";"#).unwrap();
        }
        out
    }
}
