//! Internal constants.

use std::time::Duration;

/// Default HTTP timeout for Kroki and image probe requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes fetched from a remote image to read its header.
pub const IMAGE_HEADER_LEN: u64 = 64;

/// Page setup prepended to every Typst source so the figure hugs its content.
pub const TYPST_PREAMBLE: &str = "#set page(width: auto, height: auto, margin: 0pt)\n";
