//! Quire CLI - Markdown documentation site generator.
//!
//! Provides commands for:
//! - `build`: Render every document and write all artifacts once
//! - `watch`: Build, then apply file changes until interrupted

mod commands;
mod error;
mod output;
mod setup;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, WatchArgs};
use output::Output;

/// Quire - Markdown documentation site generator.
#[derive(Parser)]
#[command(name = "quire", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every document and write all artifacts.
    Build(BuildArgs),
    /// Build, then rebuild incrementally on file changes.
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Build(args) => args.common.verbose,
        Commands::Watch(args) => args.common.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(error::CliError::from)
        .and_then(|rt| {
            rt.block_on(async {
                match cli.command {
                    Commands::Build(args) => args.execute().await,
                    Commands::Watch(args) => args.execute().await,
                }
            })
        });

    if let Err(err) = result {
        output.error(&err.to_string());
        std::process::exit(1);
    }
}
