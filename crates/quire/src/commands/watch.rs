//! `quire watch` command implementation.

use clap::Args;
use quire_storage::{DOCS_DIR, Storage, StorageEvent};
use tokio::sync::mpsc;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;
use crate::setup::{Assembled, assemble};

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the initial build fails, or
    /// watching cannot be started. Errors while applying a change are
    /// reported and watching continues.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let Assembled { mut site, storage } = assemble(&config)?;

        let (receiver, handle) = storage.watch()?;
        let report = site.build().await?;
        output.report(&report);
        output.status(
            "Watching",
            &format!(
                "{} (Ctrl+C to stop)",
                config.project.root.join(DOCS_DIR).display()
            ),
        );

        // The storage receiver blocks; forward events onto the runtime.
        let (tx, mut events) = mpsc::unbounded_channel::<StorageEvent>();
        std::thread::spawn(move || {
            while let Some(event) = receiver.recv() {
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    tracing::debug!(path = %event.pathname, kind = ?event.kind, "change");
                    match site.apply(&event).await {
                        Ok(report) => output.report(&report),
                        Err(e) => output.error(&e.to_string()),
                    }
                }
            }
        }

        handle.stop();
        output.finished("Stopped", "watching");
        Ok(())
    }
}
