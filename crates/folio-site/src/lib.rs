//! Documentation set and generation for Folio.
//!
//! This crate provides:
//! - [`DocumentationSet`]: source discovery, file classification and the
//!   [`NavigationTree`] built from the docset TOC
//! - [`plan`]: the incremental build decision based on [`GenerationState`]
//! - [`DocumentationGenerator`]: parallel rendering into the output directory,
//!   followed by `.doc.state` and `links.json`
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use folio_config::Config;
//! use folio_diagnostics::DiagnosticsCollector;
//! use folio_renderer::MarkdownParser;
//! use folio_site::{DocumentationGenerator, DocumentationSet, GeneratorOptions};
//! use folio_vcs::GitCheckout;
//!
//! let config = Config::load(None, None)?;
//! let collector = DiagnosticsCollector::new(Vec::new());
//! let set = DocumentationSet::load(&config, &collector)?;
//! let git = GitCheckout::discover(set.source_dir()).unwrap_or_else(|_| GitCheckout::unknown());
//!
//! let generator = DocumentationGenerator::new(
//!     &set,
//!     &collector,
//!     MarkdownParser::new(),
//!     git,
//!     GeneratorOptions::from_config(&config, false),
//! );
//! generator.generate()?;
//! # Ok(())
//! # }
//! ```

mod doc_set;
mod error;
mod file;
mod generator;
mod links;
mod navigation;
mod state;

pub use doc_set::{DocumentationSet, LINK_REFERENCE_FILENAME, STATE_FILENAME};
pub use error::BuildError;
pub use file::{DocumentationFile, SourceFile};
pub use generator::{DocumentationGenerator, GenerationOutcome, GeneratorOptions};
pub use links::LinkReference;
pub use navigation::{
    DocumentationGroup, GroupId, NavigationItem, NavigationPage, NavigationTree,
};
pub use state::{BuildPlan, GenerationState, plan};
