//! Extended markdown parsing for Folio.
//!
//! This crate turns a markdown source file into HTML while validating it:
//!
//! - leading YAML front matter supplies the page title and metadata
//! - `% comment` lines are dropped before parsing
//! - fenced `{name}` blocks are dispatched to [`Directive`] handlers
//! - inline links are resolved through a [`PageLookup`]; missing targets,
//!   template expressions and cross-links are reported to a
//!   [`DiagnosticsCollector`](folio_diagnostics::DiagnosticsCollector)
//!
//! Regular markdown is rendered with pulldown-cmark.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use folio_diagnostics::DiagnosticsCollector;
//! use folio_renderer::{LinkTarget, MarkdownParser};
//!
//! let pages = HashMap::from([("guide.md".to_owned(), LinkTarget { title: Some("Guide".to_owned()) })]);
//! let collector = DiagnosticsCollector::new(Vec::new());
//!
//! let doc = MarkdownParser::new().parse("index.md", "See [](guide.md)\n", &pages, &collector);
//!
//! assert_eq!(doc.html, "<p>See <a href=\"guide.html\">Guide</a></p>\n");
//! assert!(!collector.stop().has_errors());
//! ```

mod block;
mod directive;
mod fence;
mod front_matter;
mod link;
mod parser;
mod util;

pub use block::{Block, DirectiveBlock, DirectiveFence, DirectiveProperties};
pub use directive::{
    Admonition, AdmonitionKind, Applies, Availability, Deployment, Directive, DirectiveRegistry,
    ValidationContext,
};
pub use front_matter::{FrontMatter, FrontMatterError};
pub use link::{LinkResolver, LinkTarget, PageLookup, ResolvedLink, TEMPLATE_LINK_WARNING};
pub use parser::{MarkdownParser, PageMeta, ParsedDocument};
pub use util::{escape_html, parent_dir, relative_path, resolve_relative_path};
