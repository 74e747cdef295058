//! Documentation generation.
//!
//! [`DocumentationGenerator::generate`] plans the build from the previous
//! state, resolves page titles, processes files in parallel and finally writes
//! `.doc.state` and `links.json`.
//!
//! A failure processing one file becomes an error diagnostic. Once more files
//! fail than `max_uncaught_errors` allows, the build aborts.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use folio_config::{Config, DEFAULT_MAX_UNCAUGHT_ERRORS};
use folio_diagnostics::{DiagnosticsCollector, DiagnosticsSummary};
use folio_renderer::{MarkdownParser, ParsedDocument, escape_html, relative_path};
use folio_vcs::GitCheckout;
use rayon::prelude::*;

use crate::doc_set::DocumentationSet;
use crate::error::BuildError;
use crate::file::DocumentationFile;
use crate::links::LinkReference;
use crate::state::{BuildPlan, GenerationState, plan};

/// Generation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Ignore previous state and rebuild everything.
    pub force: bool,
    /// Per-file failures tolerated before aborting.
    pub max_uncaught_errors: usize,
    /// Prefix recorded in `links.json`.
    pub url_path_prefix: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            force: false,
            max_uncaught_errors: DEFAULT_MAX_UNCAUGHT_ERRORS,
            url_path_prefix: None,
        }
    }
}

impl GeneratorOptions {
    /// Options from the build configuration.
    #[must_use]
    pub fn from_config(config: &Config, force: bool) -> Self {
        Self {
            force,
            max_uncaught_errors: config.build.max_uncaught_errors,
            url_path_prefix: config.build.url_path_prefix.clone(),
        }
    }
}

/// Result of a successful [`DocumentationGenerator::generate`] call.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// No source changed since the previous build.
    Skipped,
    Generated {
        /// Files rendered or copied.
        processed: usize,
        summary: DiagnosticsSummary,
    },
}

/// Generates a documentation set into its output directory.
pub struct DocumentationGenerator<'a> {
    set: &'a DocumentationSet,
    collector: &'a DiagnosticsCollector,
    parser: MarkdownParser,
    git: GitCheckout,
    options: GeneratorOptions,
}

impl<'a> DocumentationGenerator<'a> {
    #[must_use]
    pub fn new(
        set: &'a DocumentationSet,
        collector: &'a DiagnosticsCollector,
        parser: MarkdownParser,
        git: GitCheckout,
        options: GeneratorOptions,
    ) -> Self {
        tracing::info!(
            name = %set.name(),
            source_dir = %set.source_dir().display(),
            output_dir = %set.output_dir().display(),
            "Created documentation generator"
        );
        Self {
            set,
            collector,
            parser,
            git,
            options,
        }
    }

    /// Generate the documentation set.
    ///
    /// Stops the diagnostics collector when files were processed, or when
    /// processing aborts so that every sink is flushed. On success the summary
    /// is returned and the offending files are persisted for the next build.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the output cannot be written, the channel is
    /// cancelled, or too many files fail.
    pub fn generate(&self) -> Result<GenerationOutcome, BuildError> {
        let prior = GenerationState::load(&self.set.state_file());
        if self.options.force || prior.is_none() {
            self.set.clear_output_directory()?;
        }

        let plan = plan(
            prior.as_ref(),
            self.set.last_write(),
            &self.git,
            self.options.force,
        );
        if plan == BuildPlan::Skip {
            return Ok(GenerationOutcome::Skipped);
        }

        self.set.resolve();
        self.collector.start();
        let fresh = match self.process_files(&plan) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(error = %e, "Generation aborted");
                self.collector.stop();
                return Err(e);
            }
        };
        let processed = fresh.len();

        tracing::info!("Completing diagnostics channel");
        let summary = self.collector.stop();

        fs::create_dir_all(self.set.output_dir())
            .map_err(BuildError::write(self.set.output_dir()))?;

        let cross_links = self.merge_cross_links(prior.as_ref(), &plan, fresh);
        let state = GenerationState {
            last_seen_changes: self.set.last_write(),
            invalid_files: summary.offending_files.iter().cloned().collect(),
            git: self.git.clone(),
            cross_links,
        };
        tracing::info!(last_seen_changes = %state.last_seen_changes, "Writing build state");
        state.save(&self.set.state_file())?;

        tracing::info!("Writing link reference");
        LinkReference::create(
            self.set,
            self.git.clone(),
            self.options.url_path_prefix.clone(),
            state.all_cross_links(),
        )
        .save(&self.set.link_reference_file())?;

        Ok(GenerationOutcome::Generated { processed, summary })
    }

    /// Cross-links per page after this run.
    ///
    /// Pages skipped by an incremental build keep the links recorded for them
    /// previously. Pages no longer in the set are dropped.
    fn merge_cross_links(
        &self,
        prior: Option<&GenerationState>,
        plan: &BuildPlan,
        fresh: BTreeMap<String, Vec<String>>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut merged = BTreeMap::new();
        if let (Some(prior), BuildPlan::Incremental { .. }) = (prior, plan) {
            merged.extend(
                prior
                    .cross_links
                    .iter()
                    .filter(|(file, _)| {
                        !fresh.contains_key(*file) && self.set.files().contains_key(*file)
                    })
                    .map(|(file, links)| (file.clone(), links.clone())),
            );
        }
        merged.extend(fresh.into_iter().filter(|(_, links)| !links.is_empty()));
        merged
    }

    /// Process the files selected by `plan`.
    ///
    /// Returns the cross-links of every file processed successfully, keyed by
    /// relative path; files without cross-links map to an empty list.
    fn process_files(
        &self,
        plan: &BuildPlan,
    ) -> Result<BTreeMap<String, Vec<String>>, BuildError> {
        let processed = Mutex::new(BTreeMap::new());
        let failures = AtomicUsize::new(0);
        let files: Vec<&DocumentationFile> = self
            .set
            .files()
            .values()
            .filter(|f| f.is_published())
            .collect();

        files.par_iter().try_for_each(|file| {
            if self.collector.channel().is_cancelled() {
                return Err(BuildError::Cancelled);
            }
            let source = file.source();
            if !plan.should_process(&source.relative_path, source.modified) {
                return Ok(());
            }

            match self.process_file(file) {
                Ok(cross_links) => {
                    let mut done = processed.lock().unwrap();
                    done.insert(source.relative_path.clone(), cross_links);
                    if done.len() % 100 == 0 {
                        tracing::info!(processed = done.len(), "Handled files");
                    }
                }
                Err(e) => {
                    let count = failures.fetch_add(1, Ordering::SeqCst) + 1;
                    if count > self.options.max_uncaught_errors {
                        return Err(BuildError::TooManyFailures(self.options.max_uncaught_errors));
                    }
                    self.collector.emit_error_with_source(
                        source.relative_path.as_str(),
                        "Uncaught error while processing file",
                        &e,
                    );
                }
            }
            Ok(())
        })?;

        Ok(processed.into_inner().unwrap())
    }

    fn process_file(&self, file: &DocumentationFile) -> Result<Vec<String>, BuildError> {
        let source = file.source();
        let mut output = self.set.output_dir().join(&source.relative_path);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(BuildError::write(parent))?;
        }
        tracing::trace!(path = %source.relative_path, "Processing file");

        if let DocumentationFile::Markdown(_) = file {
            let content =
                fs::read_to_string(&source.path).map_err(BuildError::read(&source.path))?;
            let doc = self
                .parser
                .parse(&source.relative_path, &content, self.set, self.collector);
            output.set_extension("html");
            fs::write(&output, self.render_page(&source.relative_path, &doc))
                .map_err(BuildError::write(&output))?;
            Ok(doc.cross_links)
        } else {
            fs::copy(&source.path, &output).map_err(BuildError::write(&output))?;
            Ok(Vec::new())
        }
    }

    /// Wrap a rendered body in a minimal document with previous/next links.
    fn render_page(&self, path: &str, doc: &ParsedDocument) -> String {
        let title = doc.title.as_deref().unwrap_or(path);
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<main>\n{}</main>\n",
            escape_html(title),
            doc.html
        );

        let links: Vec<String> = [("prev", self.set.previous(path)), ("next", self.set.next(path))]
            .into_iter()
            .filter_map(|(rel, target)| {
                let target = target?;
                let href = relative_path(&html_path(path), &html_path(target));
                Some(format!(
                    r#"<a rel="{rel}" href="{}">{}</a>"#,
                    escape_html(&href),
                    escape_html(&self.title_of(target))
                ))
            })
            .collect();
        if !links.is_empty() {
            html.push_str("<nav class=\"pagination\">");
            html.push_str(&links.concat());
            html.push_str("</nav>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn title_of(&self, path: &str) -> String {
        self.set
            .tree()
            .resolved()
            .and_then(|pages| pages.get(path))
            .and_then(|meta| meta.title.clone())
            .unwrap_or_else(|| path.to_owned())
    }
}

fn html_path(path: &str) -> String {
    match path.strip_suffix(".md") {
        Some(stem) => format!("{stem}.html"),
        None => path.to_owned(),
    }
}
