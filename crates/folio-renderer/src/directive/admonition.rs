//! Admonition directives: `{note}`, `{tip}`, `{important}`, `{warning}`,
//! `{caution}` and the generic `{admonition}`.

use super::{Directive, ValidationContext};
use crate::block::DirectiveBlock;
use crate::util::escape_html;

/// Admonition flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
    /// Generic admonition; requires an explicit title.
    Admonition,
}

impl AdmonitionKind {
    /// Every kind, in registration order.
    pub const ALL: [Self; 6] = [
        Self::Note,
        Self::Tip,
        Self::Important,
        Self::Warning,
        Self::Caution,
        Self::Admonition,
    ];

    /// Directive name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
            Self::Admonition => "admonition",
        }
    }

    fn default_title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
            Self::Admonition => "",
        }
    }
}

/// Callout box with a title and nested content.
///
/// The title comes from the fence arguments (` ```{note} Custom title `) and
/// falls back to the kind's name. The `:class:` option adds CSS classes.
#[derive(Debug)]
pub struct Admonition {
    kind: AdmonitionKind,
}

impl Admonition {
    /// Create a handler for one admonition kind.
    #[must_use]
    pub fn new(kind: AdmonitionKind) -> Self {
        Self { kind }
    }
}

impl Directive for Admonition {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn finalize(&self, block: &DirectiveBlock, ctx: &ValidationContext<'_>) {
        if self.kind == AdmonitionKind::Admonition && block.fence.arguments.is_empty() {
            ctx.emit_error("{admonition} requires a title argument");
        }
    }

    fn render(&self, block: &DirectiveBlock, body_html: &str) -> String {
        let title = if block.fence.arguments.is_empty() {
            self.kind.default_title()
        } else {
            block.fence.arguments.as_str()
        };
        let mut classes = format!("admonition {}", self.kind.name());
        if let Some(extra) = block.properties.get("class").filter(|c| !c.is_empty()) {
            classes.push(' ');
            classes.push_str(extra);
        }
        format!(
            r#"<div class="{}"><p class="admonition-title">{}</p>{body_html}</div>"#,
            escape_html(&classes),
            escape_html(title)
        )
    }
}
