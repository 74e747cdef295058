//! `folio mv` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_config::{CliSettings, Config};
use folio_diagnostics::DiagnosticsCollector;
use folio_mover::Move;
use folio_site::DocumentationSet;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the mv command.
#[derive(Args)]
pub(crate) struct MvArgs {
    /// Markdown file or directory to move.
    source: PathBuf,

    /// Destination file or directory.
    target: PathBuf,

    /// Report the link changes without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl MvArgs {
    /// Execute the mv command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the move is invalid, or
    /// applying it fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // Docset problems are reported by `folio build`, not here.
        let collector = DiagnosticsCollector::new(Vec::new());
        let set = DocumentationSet::load(&config, &collector)?;

        let outcome = Move::new(&set).execute(&self.source, &self.target, self.dry_run)?;

        for change in &outcome.modifications {
            output.link_change(change);
        }

        let files = outcome.change_sets.len();
        let links = outcome.modifications.len();
        if self.dry_run {
            output.info(&format!("Dry run: would move {files} files and rewrite {links} links"));
        } else {
            output.success(&format!("Moved {files} files and rewrote {links} links"));
        }
        Ok(())
    }
}
