//! Inline link resolution.
//!
//! Every link destination in a document is classified:
//!
//! - anchors (`#section`) pass through
//! - destinations containing `{{` are template expressions: a warning is
//!   reported and the href is emitted percent-encoded
//! - configured cross-link schemes (`kibana://page.md`) are recorded as
//!   cross-links and passed through
//! - other URIs (`https:`, `mailto:`) pass through
//! - everything else is a local path, resolved relative to the current file
//!   or, with a leading `/`, to the source root; missing targets are errors
//!   and `.md` targets are rewritten to `.html`

use std::collections::HashMap;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::util::{parent_dir, resolve_relative_path};

/// Characters escaped in template-expression links.
const TEMPLATE: &AsciiSet = &CONTROLS.add(b' ').add(b'{').add(b'}').add(b'"').add(b'<').add(b'>');

/// Message for links containing template expressions.
pub const TEMPLATE_LINK_WARNING: &str = "The url contains a template expression. Please do not use template expressions in links. See https://github.com/elastic/docs-builder/issues/182 for further information.";

/// What a local link target resolves to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkTarget {
    /// Page title, used to fill links without text.
    pub title: Option<String>,
}

/// Lookup of files by path relative to the source root.
pub trait PageLookup: Sync {
    /// Find a file; `None` if it does not exist.
    fn lookup(&self, relative_path: &str) -> Option<LinkTarget>;
}

impl PageLookup for HashMap<String, LinkTarget> {
    fn lookup(&self, relative_path: &str) -> Option<LinkTarget> {
        self.get(relative_path).cloned()
    }
}

/// Outcome of resolving one link destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedLink {
    /// Left unchanged (anchors and foreign URIs).
    Passthrough,
    /// Configured cross-link scheme.
    CrossLink,
    /// Contains a template expression; rendered with this encoded href.
    Template { href: String },
    /// Existing local file.
    Local {
        href: String,
        /// Resolved path relative to the source root.
        path: String,
        title: Option<String>,
    },
    /// Local path that does not exist.
    Missing { path: String },
}

/// Resolves link destinations for one file.
pub struct LinkResolver<'a> {
    file: &'a str,
    pages: &'a dyn PageLookup,
    cross_link_schemes: &'a [String],
}

impl<'a> LinkResolver<'a> {
    /// Create a resolver for links inside `file`.
    #[must_use]
    pub fn new(file: &'a str, pages: &'a dyn PageLookup, cross_link_schemes: &'a [String]) -> Self {
        Self {
            file,
            pages,
            cross_link_schemes,
        }
    }

    /// Classify and resolve a link destination.
    #[must_use]
    pub fn resolve(&self, url: &str) -> ResolvedLink {
        if url.is_empty() || url.starts_with('#') {
            return ResolvedLink::Passthrough;
        }
        if url.contains("{{") {
            return ResolvedLink::Template {
                href: utf8_percent_encode(url, TEMPLATE).to_string(),
            };
        }
        if let Some(scheme) = uri_scheme(url) {
            if self
                .cross_link_schemes
                .iter()
                .any(|s| s.eq_ignore_ascii_case(scheme))
            {
                return ResolvedLink::CrossLink;
            }
            return ResolvedLink::Passthrough;
        }
        if url.starts_with("//") {
            return ResolvedLink::Passthrough;
        }

        let (path_part, fragment) = match url.find('#') {
            Some(pos) => (&url[..pos], &url[pos..]),
            None => (url, ""),
        };
        let decoded = percent_decode_str(path_part).decode_utf8_lossy();
        let resolved = if let Some(absolute) = decoded.strip_prefix('/') {
            resolve_relative_path(absolute, "")
        } else {
            resolve_relative_path(&decoded, parent_dir(self.file))
        };

        match self.pages.lookup(&resolved) {
            Some(target) => ResolvedLink::Local {
                href: format!("{}{fragment}", markdown_to_html(path_part)),
                path: resolved,
                title: target.title,
            },
            None => ResolvedLink::Missing { path: resolved },
        }
    }
}

/// Rewrite a trailing `.md` extension to `.html`.
#[allow(clippy::case_sensitive_file_extension_comparisons)]
fn markdown_to_html(path: &str) -> String {
    match path.strip_suffix(".md") {
        Some(stem) => format!("{stem}.html"),
        None => path.to_owned(),
    }
}

/// Extract a URI scheme (`https`, `mailto`, `kibana`) if present.
///
/// Single letters are not schemes, so Windows drive letters stay local.
fn uri_scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    (scheme.len() > 1
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
    .then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn pages() -> HashMap<String, LinkTarget> {
        HashMap::from([
            (
                "testing/req.md".to_owned(),
                LinkTarget {
                    title: Some("Special Requirements".to_owned()),
                },
            ),
            ("_static/img/observability.png".to_owned(), LinkTarget::default()),
            ("my page.md".to_owned(), LinkTarget::default()),
        ])
    }

    fn resolve(file: &str, url: &str) -> ResolvedLink {
        let pages = pages();
        let schemes = vec!["kibana".to_owned()];
        LinkResolver::new(file, &pages, &schemes).resolve(url)
    }

    #[test]
    fn test_relative_markdown_link() {
        assert_eq!(
            resolve("index.md", "testing/req.md#setup"),
            ResolvedLink::Local {
                href: "testing/req.html#setup".to_owned(),
                path: "testing/req.md".to_owned(),
                title: Some("Special Requirements".to_owned()),
            }
        );
    }

    #[test]
    fn test_parent_relative_link() {
        assert!(matches!(
            resolve("testing/nested/page.md", "../req.md"),
            ResolvedLink::Local { href, .. } if href == "../req.html"
        ));
    }

    #[test]
    fn test_root_absolute_static_file() {
        assert!(matches!(
            resolve("testing/req.md", "/_static/img/observability.png"),
            ResolvedLink::Local { href, .. } if href == "/_static/img/observability.png"
        ));
    }

    #[test]
    fn test_missing_target() {
        assert_eq!(
            resolve("index.md", "/non-existing.md"),
            ResolvedLink::Missing {
                path: "non-existing.md".to_owned()
            }
        );
    }

    #[test]
    fn test_percent_encoded_path_is_decoded_for_lookup() {
        assert!(matches!(
            resolve("index.md", "my%20page.md"),
            ResolvedLink::Local { href, .. } if href == "my%20page.html"
        ));
    }

    #[test]
    fn test_cross_link_scheme() {
        assert_eq!(resolve("index.md", "kibana://index.md"), ResolvedLink::CrossLink);
    }

    #[test]
    fn test_external_links_pass_through() {
        assert_eq!(resolve("index.md", "https://elastic.co"), ResolvedLink::Passthrough);
        assert_eq!(resolve("index.md", "mailto:docs@example.com"), ResolvedLink::Passthrough);
        assert_eq!(resolve("index.md", "#anchor"), ResolvedLink::Passthrough);
    }

    #[test]
    fn test_template_expression_is_encoded() {
        assert_eq!(
            resolve(
                "index.md",
                "{{kibana-ref}}/introduction.html#kibana-navigation-search"
            ),
            ResolvedLink::Template {
                href: "%7B%7Bkibana-ref%7D%7D/introduction.html#kibana-navigation-search"
                    .to_owned()
            }
        );
    }

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("https://x"), Some("https"));
        assert_eq!(uri_scheme("c:/windows"), None);
        assert_eq!(uri_scheme("guide/a.md"), None);
        assert_eq!(uri_scheme("1abc:x"), None);
    }
}
