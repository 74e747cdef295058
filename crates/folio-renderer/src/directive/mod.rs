//! Directive extension contract.
//!
//! Custom block syntax plugs into parsing through the [`Directive`] trait.
//! Handlers are registered by name in a [`DirectiveRegistry`]; the parser looks
//! up each fenced `{name}` block, lets the handler validate it with a
//! [`ValidationContext`], and asks it to render the final HTML.
//!
//! Validation never aborts parsing: problems are reported as diagnostics
//! scoped to the current file and the directive's position.

mod admonition;
mod applies;

use std::collections::HashMap;

use folio_diagnostics::{Diagnostic, DiagnosticsCollector};

use crate::block::{Block, DirectiveBlock};

pub use admonition::{Admonition, AdmonitionKind};
pub use applies::{Applies, Availability, Deployment};

/// Handler for a named directive.
///
/// Handlers are shared across worker threads and must be stateless between
/// calls.
///
/// # Example
///
/// ```
/// use folio_renderer::{Directive, DirectiveBlock, DirectiveRegistry, ValidationContext};
///
/// struct Version;
///
/// impl Directive for Version {
///     fn name(&self) -> &str {
///         "version"
///     }
///
///     fn finalize(&self, block: &DirectiveBlock, ctx: &ValidationContext<'_>) {
///         if block.fence.arguments.is_empty() {
///             ctx.emit_error("{version} requires a version number");
///         }
///     }
///
///     fn render(&self, block: &DirectiveBlock, body_html: &str) -> String {
///         format!("<div class=\"version\">{}{body_html}</div>", block.fence.arguments)
///     }
/// }
///
/// let mut registry = DirectiveRegistry::new();
/// registry.register(Box::new(Version));
/// assert!(registry.get("version").is_some());
/// ```
pub trait Directive: Send + Sync {
    /// Directive name matched against `{name}`.
    fn name(&self) -> &str;

    /// Validate the parsed block. Called once per occurrence, before rendering.
    fn finalize(&self, _block: &DirectiveBlock, _ctx: &ValidationContext<'_>) {}

    /// Render the block around its already rendered body.
    fn render(&self, block: &DirectiveBlock, body_html: &str) -> String;
}

/// Name to handler lookup.
#[derive(Default)]
pub struct DirectiveRegistry {
    handlers: HashMap<String, Box<dyn Directive>>,
}

impl DirectiveRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in admonitions and `{applies}`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in AdmonitionKind::ALL {
            registry.register(Box::new(Admonition::new(kind)));
        }
        registry.register(Box::new(Applies));
        registry
    }

    /// Register a handler, replacing any handler with the same name.
    pub fn register(&mut self, handler: Box<dyn Directive>) {
        self.handlers.insert(handler.name().to_owned(), handler);
    }

    /// Look up a handler by directive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Directive> {
        self.handlers.get(name).map(Box::as_ref)
    }
}

/// Context handed to [`Directive::finalize`].
///
/// Gives read access to the sibling blocks and a diagnostics emitter scoped to
/// the current file and directive position.
pub struct ValidationContext<'a> {
    file: &'a str,
    siblings: &'a [Block],
    index: usize,
    collector: &'a DiagnosticsCollector,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(
        file: &'a str,
        siblings: &'a [Block],
        index: usize,
        collector: &'a DiagnosticsCollector,
    ) -> Self {
        Self {
            file,
            siblings,
            index,
            collector,
        }
    }

    /// Relative path of the file being parsed.
    #[must_use]
    pub fn file(&self) -> &str {
        self.file
    }

    /// The block immediately before this directive in the same parent.
    #[must_use]
    pub fn previous_sibling(&self) -> Option<&'a Block> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.siblings.get(i))
    }

    /// All blocks sharing this directive's parent.
    #[must_use]
    pub fn siblings(&self) -> &'a [Block] {
        self.siblings
    }

    /// Report an error at the directive's position.
    pub fn emit_error(&self, message: impl Into<String>) {
        self.collector.emit(self.positioned(Diagnostic::error(self.file, message)));
    }

    /// Report a warning at the directive's position.
    pub fn emit_warning(&self, message: impl Into<String>) {
        self.collector
            .emit(self.positioned(Diagnostic::warning(self.file, message)));
    }

    fn positioned(&self, diagnostic: Diagnostic) -> Diagnostic {
        match self.siblings.get(self.index) {
            Some(Block::Directive(block)) => diagnostic
                .with_position(block.line, block.column)
                .with_length(block.length),
            Some(other) => diagnostic.with_position(other.line(), 1),
            None => diagnostic,
        }
    }
}
