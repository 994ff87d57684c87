//! Terminal status lines.
//!
//! Every line starts with a right-aligned label so build and watch output
//! line up in one column: `   Building docs/`, `      Failed docs/a.md: ...`.

use console::{Style, Term};
use quire_site::BuildReport;

const LABEL_WIDTH: usize = 12;

pub(crate) struct Output {
    term: Term,
    progress: Style,
    done: Style,
    failed: Style,
    unit: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            progress: Style::new().cyan().bold(),
            done: Style::new().green().bold(),
            failed: Style::new().red().bold(),
            unit: Style::new().dim(),
        }
    }

    fn line(&self, style: &Style, label: &str, msg: &str) {
        let label = format!("{label:>LABEL_WIDTH$}");
        let _ = self
            .term
            .write_line(&format!("{} {msg}", style.apply_to(label)));
    }

    /// Work that is starting or in progress.
    pub(crate) fn status(&self, label: &str, msg: &str) {
        self.line(&self.progress, label, msg);
    }

    /// Work that completed.
    pub(crate) fn finished(&self, label: &str, msg: &str) {
        self.line(&self.done, label, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.failed, "Error", msg);
    }

    /// One line per written unit, then one per unit that failed to
    /// materialize.
    pub(crate) fn report(&self, report: &BuildReport) {
        for pathname in &report.emitted {
            self.line(&self.unit, "Wrote", pathname);
        }
        for failure in &report.failures {
            self.line(
                &self.failed,
                "Failed",
                &format!("{}: {}", failure.pathname, failure.error),
            );
        }
    }
}
