//! `folio build` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_config::{CliSettings, Config};
use folio_diagnostics::{
    DiagnosticsCollector, DiagnosticsOutput, DiagnosticsSummary, GithubAnnotationOutput, LogOutput,
    ReportOutput,
};
use folio_renderer::MarkdownParser;
use folio_site::{DocumentationGenerator, DocumentationSet, GenerationOutcome, GeneratorOptions};
use folio_vcs::GitCheckout;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory for the generated site (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ignore the previous build state and regenerate everything.
    #[arg(long)]
    force: bool,

    /// Per-file failures tolerated before the build aborts (overrides config).
    #[arg(long)]
    max_uncaught_errors: Option<usize>,

    /// Write every diagnostic to this JSON file.
    #[arg(long, env = "FOLIO_REPORT")]
    report: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the build aborts, or the
    /// build finishes with error diagnostics.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            max_uncaught_errors: self.max_uncaught_errors,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Source directory: {}",
            config.docs_resolved.source_dir.display()
        ));
        output.info(&format!(
            "Output directory: {}",
            config.docs_resolved.output_dir.display()
        ));

        let mut outputs: Vec<Box<dyn DiagnosticsOutput>> = vec![Box::new(LogOutput)];
        if let Some(github) = GithubAnnotationOutput::from_env() {
            outputs.push(Box::new(github));
        }
        if let Some(path) = self.report {
            outputs.push(Box::new(ReportOutput::new(path)));
        }
        let collector = DiagnosticsCollector::new(outputs);

        let set = DocumentationSet::load(&config, &collector)?;
        let git = GitCheckout::discover(set.source_dir()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Not a git checkout, recording unknown origin");
            GitCheckout::unknown()
        });
        let parser =
            MarkdownParser::new().with_cross_link_schemes(config.links.cross_link_schemes.clone());

        let generator = DocumentationGenerator::new(
            &set,
            &collector,
            parser,
            git,
            GeneratorOptions::from_config(&config, self.force),
        );

        let outcome = match generator.generate() {
            Ok(outcome) => outcome,
            Err(e) => {
                output.diagnostics(&collector.stop());
                return Err(e.into());
            }
        };
        let summary = match outcome {
            GenerationOutcome::Skipped => {
                output.info("No changes since the last build. Pass --force to regenerate");
                collector.stop()
            }
            GenerationOutcome::Generated { processed, summary } => {
                output.build_header(&set.name(), processed);
                summary
            }
        };

        report(&output, &summary)
    }
}

fn report(output: &Output, summary: &DiagnosticsSummary) -> Result<(), CliError> {
    output.diagnostics(summary);
    if summary.has_errors() {
        return Err(CliError::Validation(format!(
            "Build failed with {} errors",
            summary.errors
        )));
    }
    output.success("Build succeeded");
    Ok(())
}
