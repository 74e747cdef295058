//! Colored terminal output for build summaries and move reports.

use console::{Style, Term};
use folio_diagnostics::DiagnosticsSummary;
use folio_mover::LinkModification;

/// Terminal output formatter writing to stderr.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        self.line(&Style::new().green().apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&Style::new().red().apply_to(msg).to_string());
    }

    /// Print the header of a finished build.
    pub(crate) fn build_header(&self, name: &str, processed: usize) {
        self.line(&"=".repeat(70));
        self.line(
            &Style::new()
                .cyan()
                .bold()
                .apply_to(format!("Built {name} ({processed} files)"))
                .to_string(),
        );
    }

    /// Print error and warning counts; yellow when only warnings were found.
    pub(crate) fn diagnostics(&self, summary: &DiagnosticsSummary) {
        if summary.errors == 0 && summary.warnings == 0 {
            return;
        }
        let msg = format!(
            "{} errors, {} warnings in {} files",
            summary.errors,
            summary.warnings,
            summary.offending_files.len()
        );
        let style = if summary.has_errors() {
            Style::new().red()
        } else {
            Style::new().yellow()
        };
        self.line(&style.apply_to(msg).to_string());
    }

    /// Print a rewritten link as `Change <old> to <new> at <file>:<line>:<column>`.
    pub(crate) fn link_change(&self, change: &LinkModification) {
        self.line(&format!(
            "Change {} to {} at {}",
            Style::new().red().apply_to(&change.old_link),
            Style::new().green().apply_to(&change.new_link),
            Style::new().blue().apply_to(format!(
                "{}:{}:{}",
                change.source_file.display(),
                change.line,
                change.column
            )),
        ));
    }
}
