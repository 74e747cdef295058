//! Document parsing pipelines.
//!
//! Two pipelines exist:
//!
//! - [`MarkdownParser::minimal_parse`]: front matter and title only, no
//!   diagnostics; used to resolve page titles before rendering
//! - [`MarkdownParser::parse`]: full pipeline; scans blocks, validates
//!   directives, resolves links and renders HTML, reporting problems to a
//!   [`DiagnosticsCollector`]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::Range;

use folio_diagnostics::{Diagnostic, DiagnosticsCollector};
use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::block::{Block, scan};
use crate::directive::{DirectiveRegistry, ValidationContext};
use crate::front_matter::{self, FrontMatter};
use crate::link::{LinkResolver, PageLookup, ResolvedLink, TEMPLATE_LINK_WARNING};
use crate::util::{escape_html, slugify};

/// Title and metadata of a page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageMeta {
    /// Front matter title, else the first H1 heading.
    pub title: Option<String>,
    /// Parsed front matter.
    pub front_matter: FrontMatter,
}

/// Fully parsed page.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDocument {
    /// Front matter title, else the first H1 heading.
    pub title: Option<String>,
    /// Parsed front matter.
    pub front_matter: FrontMatter,
    /// Top-level blocks.
    pub blocks: Vec<Block>,
    /// Rendered body HTML.
    pub html: String,
    /// Cross-links found in this page, sorted and deduplicated.
    pub cross_links: Vec<String>,
}

/// Extended markdown parser.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
///
/// use folio_diagnostics::DiagnosticsCollector;
/// use folio_renderer::{LinkTarget, MarkdownParser};
///
/// let parser = MarkdownParser::new();
/// let pages: HashMap<String, LinkTarget> = HashMap::new();
/// let collector = DiagnosticsCollector::new(Vec::new());
///
/// let doc = parser.parse("index.md", "# Hello\n\n[Missing](gone.md)\n", &pages, &collector);
///
/// assert_eq!(doc.title.as_deref(), Some("Hello"));
/// assert_eq!(collector.stop().errors, 1);
/// ```
pub struct MarkdownParser {
    registry: DirectiveRegistry,
    cross_link_schemes: Vec<String>,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a parser with the built-in directives and the `kibana` cross-link scheme.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: DirectiveRegistry::with_defaults(),
            cross_link_schemes: vec!["kibana".to_owned()],
        }
    }

    /// Replace the directive registry.
    #[must_use]
    pub fn with_registry(mut self, registry: DirectiveRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the URI schemes recorded as cross-links.
    #[must_use]
    pub fn with_cross_link_schemes(mut self, schemes: Vec<String>) -> Self {
        self.cross_link_schemes = schemes;
        self
    }

    /// Extract front matter and title without validation.
    ///
    /// Malformed front matter is ignored here; the full parse reports it.
    #[must_use]
    pub fn minimal_parse(source: &str) -> PageMeta {
        let split = front_matter::split(source);
        let front_matter = split
            .yaml
            .and_then(|yaml| FrontMatter::from_yaml(yaml).ok())
            .unwrap_or_default();
        let title = front_matter
            .title
            .clone()
            .or_else(|| first_h1(&scan(split.body, split.body_line)));
        PageMeta {
            title,
            front_matter,
        }
    }

    /// Parse and render a document.
    ///
    /// # Arguments
    ///
    /// * `file` - Path of the document relative to the source root
    /// * `source` - Document content
    /// * `pages` - Lookup used to resolve local links
    /// * `collector` - Receives diagnostics and cross-links
    pub fn parse(
        &self,
        file: &str,
        source: &str,
        pages: &dyn PageLookup,
        collector: &DiagnosticsCollector,
    ) -> ParsedDocument {
        let split = front_matter::split(source);
        let front_matter = match split.yaml.map(FrontMatter::from_yaml) {
            Some(Ok(front_matter)) => front_matter,
            Some(Err(e)) => {
                collector.emit(Diagnostic::error(file, e.to_string()).with_position(1, 1));
                FrontMatter::default()
            }
            None => FrontMatter::default(),
        };

        let blocks = scan(split.body, split.body_line);
        let state = RenderState {
            file,
            resolver: LinkResolver::new(file, pages, &self.cross_link_schemes),
            collector,
            cross_links: RefCell::new(BTreeSet::new()),
        };
        let html = self.render_blocks(&blocks, &state);
        let title = front_matter.title.clone().or_else(|| first_h1(&blocks));
        tracing::debug!(file, blocks = blocks.len(), "Parsed document");

        ParsedDocument {
            title,
            front_matter,
            blocks,
            html,
            cross_links: state.cross_links.into_inner().into_iter().collect(),
        }
    }

    fn render_blocks(&self, blocks: &[Block], state: &RenderState<'_>) -> String {
        let mut html = String::new();
        for (index, block) in blocks.iter().enumerate() {
            match block {
                Block::Heading { level, text, line } => {
                    let source = format!("{} {text}", "#".repeat(usize::from(*level)));
                    html.push_str(&render_markdown(&source, SourceLines::new(*line, &[]), state));
                }
                Block::Markdown {
                    text,
                    line,
                    comments,
                } => {
                    html.push_str(&render_markdown(text, SourceLines::new(*line, comments), state));
                }
                Block::Code { info, content, .. } => {
                    html.push_str(&render_code(info, content));
                }
                Block::Directive(directive) => {
                    let ctx = ValidationContext::new(state.file, blocks, index, state.collector);
                    let body = self.render_blocks(&directive.children, state);
                    if let Some(handler) = self.registry.get(&directive.name) {
                        handler.finalize(directive, &ctx);
                        html.push_str(&handler.render(directive, &body));
                    } else {
                        ctx.emit_warning(format!("Unknown directive {{{}}}", directive.name));
                        html.push_str(&format!(
                            r#"<div class="directive {}">{body}</div>"#,
                            escape_html(&directive.name)
                        ));
                    }
                }
            }
        }
        html
    }
}

struct RenderState<'a> {
    file: &'a str,
    resolver: LinkResolver<'a>,
    collector: &'a DiagnosticsCollector,
    cross_links: RefCell<BTreeSet<String>>,
}

impl RenderState<'_> {
    /// Resolve a link, reporting problems; returns the href and an optional
    /// title for links without text.
    fn rewrite_link(
        &self,
        url: &str,
        text: &str,
        range: Range<usize>,
        lines: SourceLines<'_>,
    ) -> (String, Option<String>) {
        let (line, column) = position(text, range.start, lines);
        let positioned = |d: Diagnostic| d.with_position(line, column).with_length(range.len());

        match self.resolver.resolve(url) {
            ResolvedLink::Passthrough => (url.to_owned(), None),
            ResolvedLink::CrossLink => {
                self.collector.emit_cross_link(url);
                self.cross_links.borrow_mut().insert(url.to_owned());
                (url.to_owned(), None)
            }
            ResolvedLink::Template { href } => {
                self.collector
                    .emit(positioned(Diagnostic::warning(self.file, TEMPLATE_LINK_WARNING)));
                (href, None)
            }
            ResolvedLink::Local { href, title, .. } => (href, title),
            ResolvedLink::Missing { path } => {
                self.collector.emit(positioned(Diagnostic::error(
                    self.file,
                    format!("`{url}` does not exist. resolved to `{path}`"),
                )));
                (url.to_owned(), None)
            }
        }
    }
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render a markdown chunk, resolving links and stripping raw HTML.
fn render_markdown(text: &str, lines: SourceLines<'_>, state: &RenderState<'_>) -> String {
    let mut events: Vec<Event<'_>> = Vec::new();
    // Title to insert if the current link turns out to have no text.
    let mut link_fill: Option<(usize, String)> = None;

    for (event, range) in Parser::new_ext(text, options()).into_offset_iter() {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    dest_url
                } else {
                    let (href, fill) = state.rewrite_link(&dest_url, text, range, lines);
                    link_fill = fill.map(|f| (events.len() + 1, f));
                    CowStr::from(href)
                };
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let (href, _) = state.rewrite_link(&dest_url, text, range, lines);
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: CowStr::from(href),
                    title,
                    id,
                }));
            }
            Event::End(TagEnd::Link) => {
                if let Some((start, fill)) = link_fill.take()
                    && start == events.len()
                {
                    events.push(Event::Text(CowStr::from(fill)));
                }
                events.push(Event::End(TagEnd::Link));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    assign_heading_ids(&mut events);

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

/// Give headings without an explicit `{#id}` a slug id.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    for i in 0..events.len() {
        if !matches!(events[i], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }
        let text: String = events[i + 1..]
            .iter()
            .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect();
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slugify(&text)));
        }
    }
}

fn render_code(info: &str, content: &str) -> String {
    let lang = info.split_whitespace().next().unwrap_or_default();
    let body = if content.is_empty() {
        String::new()
    } else {
        format!("{}\n", escape_html(content))
    };
    if lang.is_empty() {
        format!("<pre><code>{body}</code></pre>\n")
    } else {
        format!(
            r#"<pre><code class="language-{}">{body}</code></pre>
"#,
            escape_html(lang)
        )
    }
}

/// 1-based line and column of a byte offset within a chunk.
/// Maps lines of a markdown chunk back to the source file.
#[derive(Clone, Copy)]
struct SourceLines<'a> {
    first: usize,
    /// Sorted source lines removed from the chunk.
    comments: &'a [usize],
}

impl<'a> SourceLines<'a> {
    fn new(first: usize, comments: &'a [usize]) -> Self {
        Self { first, comments }
    }

    /// Source line of the chunk's 0-based line `offset`.
    fn line(self, offset: usize) -> usize {
        self.comments
            .iter()
            .fold(self.first + offset, |line, &comment| line + usize::from(comment <= line))
    }
}

fn position(text: &str, offset: usize, lines: SourceLines<'_>) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = lines.line(before.matches('\n').count());
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Plain text of the first level-1 heading.
fn first_h1(blocks: &[Block]) -> Option<String> {
    blocks.iter().find_map(|block| match block {
        Block::Heading { level: 1, text, .. } => Some(plain_text(text)),
        _ => None,
    })
}

/// Strip inline markup from a heading.
fn plain_text(markdown: &str) -> String {
    Parser::new_ext(markdown, options())
        .filter_map(|event| match event {
            Event::Text(t) | Event::Code(t) => Some(t.into_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use folio_diagnostics::{DiagnosticsSummary, Severity};
    use pretty_assertions::assert_eq;

    use crate::link::LinkTarget;

    fn pages() -> HashMap<String, LinkTarget> {
        HashMap::from([
            (
                "testing/req.md".to_owned(),
                LinkTarget {
                    title: Some("Special Requirements".to_owned()),
                },
            ),
            ("_static/img/observability.png".to_owned(), LinkTarget::default()),
        ])
    }

    fn parse(source: &str) -> (ParsedDocument, DiagnosticsSummary, Vec<String>) {
        let collector = DiagnosticsCollector::new(Vec::new());
        let doc = MarkdownParser::new().parse("index.md", source, &pages(), &collector);
        let cross_links = collector.cross_links();
        (doc, collector.stop(), cross_links)
    }

    #[test]
    fn test_link_to_static_file() {
        let (doc, summary, _) = parse("[Elasticsearch](/_static/img/observability.png)\n");

        assert!(
            doc.html
                .contains(r#"<p><a href="/_static/img/observability.png">Elasticsearch</a></p>"#),
            "{}",
            doc.html
        );
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_link_to_page_is_rewritten() {
        let (doc, summary, cross_links) = parse("[Requirements](testing/req.md)\n");

        assert!(doc.html.contains(r#"<p><a href="testing/req.html">Requirements</a></p>"#));
        assert!(summary.diagnostics.is_empty());
        assert!(cross_links.is_empty());
    }

    #[test]
    fn test_empty_link_text_uses_page_title() {
        let (doc, summary, _) = parse("[](testing/req.md)\n");

        assert!(
            doc.html
                .contains(r#"<p><a href="testing/req.html">Special Requirements</a></p>"#),
            "{}",
            doc.html
        );
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_reference_link() {
        let (doc, summary, _) = parse("[test][test]\n\n[test]: testing/req.md\n");

        assert!(doc.html.contains(r#"<p><a href="testing/req.html">test</a></p>"#));
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_cross_link_is_recorded() {
        let (doc, summary, cross_links) = parse("Go to [test](kibana://index.md)\n");

        assert!(doc.html.contains(r#"<p>Go to <a href="kibana://index.md">test</a></p>"#));
        assert!(summary.diagnostics.is_empty());
        assert_eq!(cross_links, vec!["kibana://index.md"]);
        assert_eq!(doc.cross_links, vec!["kibana://index.md"]);
    }

    #[test]
    fn test_template_expression_warns() {
        let (doc, summary, _) = parse(
            "[global search field]({{kibana-ref}}/introduction.html#kibana-navigation-search)\n",
        );

        assert!(
            doc.html.contains(
                r#"<p><a href="%7B%7Bkibana-ref%7D%7D/introduction.html#kibana-navigation-search">global search field</a></p>"#
            ),
            "{}",
            doc.html
        );
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.diagnostics[0].severity, Severity::Warning);
        assert!(summary.diagnostics[0].message.contains(TEMPLATE_LINK_WARNING));
    }

    #[test]
    fn test_commented_links_are_ignored() {
        let (doc, summary, _) = parse("% [Non Existing Link](/non-existing.md)\n");

        assert!(doc.html.trim().is_empty());
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_comment_between_list_items() {
        let (doc, summary, _) = parse(
            "% Hello, this is a [Non Existing Link](/non-existing.md).\nLinks:\n- [](/testing/req.md)\n% - [Non Existing Link](/non-existing.md)\n- [](/testing/req.md)\n",
        );

        assert_eq!(
            doc.html.trim_end(),
            "<p>Links:</p>\n<ul>\n<li><a href=\"/testing/req.html\">Special Requirements</a></li>\n<li><a href=\"/testing/req.html\">Special Requirements</a></li>\n</ul>"
        );
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_position_after_dropped_comment() {
        let (_, summary, _) = parse("Intro\n% hidden\n[Missing](/gone.md)\n");

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.diagnostics[0].line, Some(3));
        assert_eq!(summary.diagnostics[0].column, Some(1));
    }

    #[test]
    fn test_missing_links_report_each_occurrence() {
        let (_, summary, _) = parse(
            "[Non Existing Link](/non-existing.md)\n- [Non Existing Link](/non-existing.md)\nThis is another [Non Existing Link](/non-existing.md)\n% This is a commented [Non Existing Link](/non-existing.md)\n",
        );

        assert_eq!(summary.errors, 3);
        let first = &summary.diagnostics[0];
        assert_eq!(first.line, Some(1));
        assert_eq!(first.column, Some(1));
        assert_eq!(
            first.message,
            "`/non-existing.md` does not exist. resolved to `non-existing.md`"
        );
        assert_eq!(summary.diagnostics[1].line, Some(2));
        assert_eq!(summary.diagnostics[1].column, Some(3));
    }

    #[test]
    fn test_link_positions_after_front_matter() {
        let (_, summary, _) = parse("---\ntitle: T\n---\n\nText [x](gone.md)\n");

        assert_eq!(summary.diagnostics[0].line, Some(5));
        assert_eq!(summary.diagnostics[0].column, Some(6));
    }

    #[test]
    fn test_directive_validation_and_rendering() {
        let (doc, summary, _) = parse(
            "# Install\n\nIntro\n\n```{applies}\n:stack: all\n```\n\n:::{note}\nSee [](testing/req.md)\n:::\n",
        );

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.diagnostics[0].message, "{applies} should follow a heading");
        assert!(doc.html.contains(r#"<dl class="applies">"#));
        assert!(doc.html.contains(
            r#"<div class="admonition note"><p class="admonition-title">Note</p><p>See <a href="testing/req.html">Special Requirements</a></p>"#
        ));
    }

    #[test]
    fn test_unknown_directive_warns() {
        let (doc, summary, _) = parse("```{mystery}\nbody\n```\n");

        assert_eq!(summary.warnings, 1);
        assert!(doc.html.contains(r#"<div class="directive mystery"><p>body</p>"#));
    }

    #[test]
    fn test_headings_get_slug_ids() {
        let (doc, _, _) = parse("# Getting *Started*\n## Custom {#custom-id}\n");

        assert!(doc.html.contains(r#"<h1 id="getting-started">"#), "{}", doc.html);
        assert!(doc.html.contains(r#"<h2 id="custom-id">"#), "{}", doc.html);
        assert_eq!(doc.title.as_deref(), Some("Getting Started"));
    }

    #[test]
    fn test_code_block_is_escaped() {
        let (doc, summary, _) = parse("```html\n<b>[x](gone.md)</b>\n```\n");

        assert_eq!(
            doc.html,
            "<pre><code class=\"language-html\">&lt;b&gt;[x](gone.md)&lt;/b&gt;\n</code></pre>\n"
        );
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let (doc, _, _) = parse("Hello <script>alert(1)</script>\n");
        assert!(!doc.html.contains("<script>"), "{}", doc.html);
    }

    #[test]
    fn test_invalid_front_matter_is_reported() {
        let (_, summary, _) = parse("---\ntitle: [oops\n---\n# T\n");
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.diagnostics[0].line, Some(1));
    }

    #[test]
    fn test_minimal_parse_title() {
        assert_eq!(
            MarkdownParser::minimal_parse("---\ntitle: From Front Matter\n---\n# Heading\n").title,
            Some("From Front Matter".to_owned())
        );
        assert_eq!(
            MarkdownParser::minimal_parse("Intro\n\n# `Code` Title\n").title,
            Some("Code Title".to_owned())
        );
        assert_eq!(MarkdownParser::minimal_parse("## Only h2\n").title, None);
    }
}
