//! CLI error types.

use quire_config::ConfigError;
use quire_site::{SiteError, TimeError};
use quire_storage::StorageError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Site(#[from] SiteError),

    #[error("{0}")]
    Time(#[from] TimeError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{count} output unit(s) could not be materialized")]
    Emit { count: usize },
}
