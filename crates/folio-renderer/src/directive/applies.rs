//! `{applies}` directive: product availability metadata under a heading.
//!
//! ````text
//! ## Snapshot lifecycle
//!
//! ```{applies}
//! :stack: ga 8.15
//! :serverless: all
//! ```
//! ````
//!
//! Keys: `cloud` (hosted and serverless), `self` (stack, ece and eck), and
//! the individual `stack`, `ece`, `eck`, `hosted`, `serverless`. Specific keys
//! override the grouped ones.

use std::fmt;

use super::{Directive, ValidationContext};
use crate::block::{Block, DirectiveBlock, DirectiveProperties};
use crate::util::escape_html;

const LIFECYCLES: &[&str] = &[
    "ga",
    "beta",
    "preview",
    "technical-preview",
    "coming",
    "deprecated",
    "discontinued",
    "removed",
    "unavailable",
];

/// Availability of a product: everywhere, or a lifecycle and/or version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    All,
    Version {
        lifecycle: Option<String>,
        version: Option<String>,
    },
}

impl Availability {
    /// Parse `all`, `8.15`, `beta`, or `beta 8.15`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }

        let mut lifecycle = None;
        let mut version = None;
        for part in value.split_whitespace() {
            let lower = part.to_ascii_lowercase();
            if lifecycle.is_none() && version.is_none() && LIFECYCLES.contains(&lower.as_str()) {
                lifecycle = Some(lower);
            } else if version.is_none() && is_version(part) {
                version = Some(part.to_owned());
            } else {
                return None;
            }
        }

        if lifecycle.is_none() && version.is_none() {
            return None;
        }
        Some(Self::Version { lifecycle, version })
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Version { lifecycle, version } => {
                let parts: Vec<&str> = lifecycle
                    .iter()
                    .chain(version.iter())
                    .map(String::as_str)
                    .collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}

/// `1`, `8.15` or `8.15.2`.
fn is_version(value: &str) -> bool {
    let value = value.strip_prefix('v').unwrap_or(value);
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() <= 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Per-product availability declared by an `{applies}` block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deployment {
    pub stack: Option<Availability>,
    pub ece: Option<Availability>,
    pub eck: Option<Availability>,
    pub hosted: Option<Availability>,
    pub serverless: Option<Availability>,
}

impl Deployment {
    /// Build from directive options.
    ///
    /// Returns the deployment (if any key parsed) and the keys whose values
    /// could not be parsed.
    #[must_use]
    pub fn from_properties(properties: &DirectiveProperties) -> (Option<Self>, Vec<String>) {
        let mut deployment = Self::default();
        let mut any = false;
        let mut invalid = Vec::new();

        let mut availability = |key: &str| -> Option<Availability> {
            let value = properties.get(key)?;
            let parsed = Availability::parse(value);
            if parsed.is_none() {
                invalid.push(key.to_owned());
            }
            any |= parsed.is_some();
            parsed
        };

        if let Some(a) = availability("cloud") {
            deployment.hosted = Some(a.clone());
            deployment.serverless = Some(a);
        }
        if let Some(a) = availability("self") {
            deployment.stack = Some(a.clone());
            deployment.ece = Some(a.clone());
            deployment.eck = Some(a);
        }
        for (key, slot) in [
            ("stack", &mut deployment.stack),
            ("ece", &mut deployment.ece),
            ("eck", &mut deployment.eck),
            ("hosted", &mut deployment.hosted),
            ("serverless", &mut deployment.serverless),
        ] {
            if let Some(a) = availability(key) {
                *slot = Some(a);
            }
        }

        (any.then_some(deployment), invalid)
    }

    fn entries(&self) -> impl Iterator<Item = (&'static str, &Availability)> {
        [
            ("Elastic Stack", &self.stack),
            ("Elastic Cloud Enterprise", &self.ece),
            ("Elastic Cloud on Kubernetes", &self.eck),
            ("Elastic Cloud Hosted", &self.hosted),
            ("Elastic Cloud Serverless", &self.serverless),
        ]
        .into_iter()
        .filter_map(|(label, a)| a.as_ref().map(|a| (label, a)))
    }
}

/// Handler for `{applies}`.
#[derive(Debug)]
pub struct Applies;

impl Directive for Applies {
    fn name(&self) -> &'static str {
        "applies"
    }

    fn finalize(&self, block: &DirectiveBlock, ctx: &ValidationContext<'_>) {
        let (deployment, invalid) = Deployment::from_properties(&block.properties);
        for key in invalid {
            let value = block.properties.get(&key).unwrap_or_default();
            ctx.emit_warning(format!(
                "{{applies}} has an invalid availability for `{key}`: `{value}`"
            ));
        }
        if deployment.is_none() {
            ctx.emit_error("{applies} block with no product availability specified");
        }

        if let Some(previous) = ctx.previous_sibling()
            && !matches!(previous, Block::Heading { .. })
        {
            ctx.emit_error("{applies} should follow a heading");
        }
    }

    fn render(&self, block: &DirectiveBlock, _body_html: &str) -> String {
        let (deployment, _) = Deployment::from_properties(&block.properties);
        let Some(deployment) = deployment else {
            return String::new();
        };
        let mut html = String::from(r#"<dl class="applies">"#);
        for (label, availability) in deployment.entries() {
            html.push_str(&format!(
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(label),
                escape_html(&availability.to_string())
            ));
        }
        html.push_str("</dl>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use folio_diagnostics::DiagnosticsCollector;
    use pretty_assertions::assert_eq;

    use crate::block::scan;

    fn finalize(source: &str, index: usize) -> folio_diagnostics::DiagnosticsSummary {
        let blocks = scan(source, 1);
        let collector = DiagnosticsCollector::new(Vec::new());
        let ctx = ValidationContext::new("a.md", &blocks, index, &collector);
        let Block::Directive(block) = &blocks[index] else {
            panic!("expected directive at {index}: {blocks:?}");
        };
        Applies.finalize(block, &ctx);
        collector.stop()
    }

    #[test]
    fn test_parse_availability() {
        assert_eq!(Availability::parse("all"), Some(Availability::All));
        assert_eq!(
            Availability::parse("beta 8.15"),
            Some(Availability::Version {
                lifecycle: Some("beta".to_owned()),
                version: Some("8.15".to_owned()),
            })
        );
        assert_eq!(
            Availability::parse("9.0.1"),
            Some(Availability::Version {
                lifecycle: None,
                version: Some("9.0.1".to_owned()),
            })
        );
        assert_eq!(Availability::parse("soon"), None);
        assert_eq!(Availability::parse(""), None);
    }

    #[test]
    fn test_grouped_keys_are_overridden() {
        let blocks = scan("```{applies}\n:self: all\n:stack: 8.15\n```\n", 1);
        let Block::Directive(block) = &blocks[0] else {
            panic!("expected directive");
        };

        let (deployment, invalid) = Deployment::from_properties(&block.properties);
        let deployment = deployment.unwrap();

        assert!(invalid.is_empty());
        assert_eq!(deployment.ece, Some(Availability::All));
        assert_eq!(deployment.stack.unwrap().to_string(), "8.15");
        assert!(deployment.hosted.is_none());
    }

    #[test]
    fn test_valid_block_after_heading() {
        let summary = finalize("## Setup\n```{applies}\n:cloud: ga\n```\n", 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.warnings, 0);
    }

    #[test]
    fn test_block_without_availability() {
        let summary = finalize("# Title\n```{applies}\n```\n", 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(
            summary.diagnostics[0].message,
            "{applies} block with no product availability specified"
        );
    }

    #[test]
    fn test_block_must_follow_heading() {
        let summary = finalize("Intro text.\n```{applies}\n:eck: all\n```\n", 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.diagnostics[0].message, "{applies} should follow a heading");
        assert_eq!(summary.diagnostics[0].line, Some(2));
    }

    #[test]
    fn test_first_block_needs_no_heading() {
        let summary = finalize("```{applies}\n:eck: all\n```\n", 0);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn test_invalid_value_warns() {
        let summary = finalize("# T\n```{applies}\n:stack: someday\n```\n", 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_render() {
        let blocks = scan("```{applies}\n:hosted: all\n:stack: beta 9.0\n```\n", 1);
        let Block::Directive(block) = &blocks[0] else {
            panic!("expected directive");
        };

        assert_eq!(
            Applies.render(block, ""),
            r#"<dl class="applies"><dt>Elastic Stack</dt><dd>beta 9.0</dd><dt>Elastic Cloud Hosted</dt><dd>all</dd></dl>"#
        );
    }
}
