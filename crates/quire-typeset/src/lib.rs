//! Figure typesetting and remote image probing for quire.
//!
//! Implements the renderer's external collaborators:
//! - [`TypstTypesetter`]: `typst`/`typ` fences compiled by the Typst CLI
//! - [`KrokiTypesetter`]: `PlantUML`, Mermaid, `GraphViz` and D2 fences rendered by a Kroki server
//! - [`CachedTypesetter`]: content-hash cache in front of either
//! - [`RemoteImageProbe`]: dimensions of external images, resolved as awaits
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quire_cache::{Cache, NullCache};
//! use quire_renderer::MarkdownRenderer;
//! use quire_typeset::{CachedTypesetter, TYPESET_BUCKET, TypstTypesetter};
//!
//! let typst = TypstTypesetter::new("typst", vec!["typst".into(), "typ".into()]);
//! let renderer = MarkdownRenderer::new()
//!     .with_typesetter(Arc::new(CachedTypesetter::new(typst, NullCache.bucket(TYPESET_BUCKET))));
//! ```

mod cache;
mod consts;
mod error;
mod kroki;
mod language;
mod probe;
mod typst;

pub use cache::{CachedTypesetter, TYPESET_BUCKET, figure_key};
pub use consts::DEFAULT_TIMEOUT;
pub use error::TypesetError;
pub use kroki::{KrokiTypesetter, create_agent};
pub use language::DiagramLanguage;
pub use probe::RemoteImageProbe;
pub use typst::TypstTypesetter;
