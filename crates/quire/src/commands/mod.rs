//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod watch;

use std::path::PathBuf;

use clap::Args;
use quire_config::{CliSettings, Config};

pub(crate) use build::BuildArgs;
pub(crate) use watch::WatchArgs;

use crate::error::CliError;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover quire.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Kroki server URL for diagram typesetting (overrides config).
    #[arg(long, env = "QUIRE_KROKI_URL")]
    kroki_url: Option<String>,

    /// Measure remote images (overrides config).
    #[arg(long)]
    image_probe: bool,

    /// Disable the typeset cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (log every artifact written).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            output_dir: self.output.clone(),
            cache_enabled: self.no_cache.then_some(false),
            kroki_url: self.kroki_url.clone(),
            image_probe: self.image_probe.then_some(true),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}
