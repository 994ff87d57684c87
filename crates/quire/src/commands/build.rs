//! `quire build` command implementation.

use std::time::Instant;

use clap::Args;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;
use crate::setup::{Assembled, assemble};

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the site cannot be built, or
    /// any output unit fails to materialize.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let Assembled { mut site, .. } = assemble(&config)?;

        output.status("Building", &config.project.root.display().to_string());
        output.status("Output", &config.project.output_dir.display().to_string());

        let started = Instant::now();
        let report = site.build().await?;
        output.report(&report);

        if !report.failures.is_empty() {
            return Err(CliError::Emit {
                count: report.failures.len(),
            });
        }
        output.finished(
            "Finished",
            &format!(
                "{} documents in {:.2?}",
                site.entries().len(),
                started.elapsed()
            ),
        );
        Ok(())
    }
}
