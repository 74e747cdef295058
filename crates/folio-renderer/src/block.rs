//! Block-level scanning.
//!
//! Splits a markdown body into top-level blocks: ATX headings, directive
//! fences, plain code fences and markdown chunks. Directive bodies are scanned
//! recursively. Lines starting with `%` are comments; they are dropped and end
//! the current markdown chunk.
//!
//! Directive syntax:
//!
//! ````text
//! ```{note} Optional arguments
//! :class: wide
//! :open: true
//!
//! Body markdown.
//! ```
//! ````
//!
//! `~~~{name}` and `:::{name}` fences are accepted as well. Option lines
//! (`:key: value`) at the top of the body form the directive's property bag.

use std::collections::BTreeMap;

use crate::fence::{detect_fence, is_closing_fence};

/// Opening fence metadata of a directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveFence {
    /// Fence character: backtick, tilde or colon.
    pub delimiter: char,
    /// Number of fence characters.
    pub count: usize,
    /// Everything after the fence characters, trimmed.
    pub info: String,
    /// Text after the `{name}` part, trimmed.
    pub arguments: String,
}

/// String-keyed directive options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectiveProperties(BTreeMap<String, String>);

impl DirectiveProperties {
    /// Look up an option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether an option is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Whether no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), value.to_owned());
    }
}

/// A fenced directive with its nested content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveBlock {
    /// Directive name from `{name}`.
    pub name: String,
    /// Opening fence metadata.
    pub fence: DirectiveFence,
    /// Option lines from the top of the body.
    pub properties: DirectiveProperties,
    /// Nested blocks.
    pub children: Vec<Block>,
    /// 1-based line of the opening fence.
    pub line: usize,
    /// 1-based column of the opening fence.
    pub column: usize,
    /// Length of the opening fence line, trimmed.
    pub length: usize,
}

/// A top-level block of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// ATX heading.
    Heading {
        level: u8,
        text: String,
        line: usize,
    },
    /// Regular markdown, rendered by pulldown-cmark.
    Markdown {
        text: String,
        line: usize,
        /// Lines of comments removed from within the chunk.
        comments: Vec<usize>,
    },
    /// Fenced code without a directive name.
    Code {
        info: String,
        content: String,
        line: usize,
    },
    /// Custom directive.
    Directive(DirectiveBlock),
}

impl Block {
    /// 1-based line where the block starts.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Heading { line, .. } | Self::Markdown { line, .. } | Self::Code { line, .. } => {
                *line
            }
            Self::Directive(directive) => directive.line,
        }
    }
}

/// Scan a markdown body whose first line is `first_line`.
pub(crate) fn scan(body: &str, first_line: usize) -> Vec<Block> {
    let lines: Vec<&str> = body.lines().collect();
    scan_lines(&lines, first_line)
}

fn scan_lines(lines: &[&str], first_line: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut chunk = ChunkBuilder::default();
    let mut i = 0;

    while i < lines.len() {
        let line_no = first_line + i;
        let line = lines[i];
        let trimmed = line.trim_start();

        if trimmed.starts_with('%') {
            chunk.skip(line_no);
            i += 1;
        } else if let Some((delimiter, count)) = detect_fence(trimmed) {
            chunk.flush(&mut blocks);
            let close = lines[i + 1..]
                .iter()
                .position(|l| is_closing_fence(l.trim_start(), delimiter, count))
                .map(|offset| i + 1 + offset);
            let body_end = close.unwrap_or(lines.len());
            let body = &lines[i + 1..body_end];
            let info = trimmed[count..].trim();

            match directive_name(info, delimiter) {
                Some((name, arguments)) => {
                    let fence = DirectiveFence {
                        delimiter,
                        count,
                        info: info.to_owned(),
                        arguments: arguments.to_owned(),
                    };
                    blocks.push(Block::Directive(scan_directive(
                        name,
                        fence,
                        body,
                        line_no,
                        line.len() - trimmed.len() + 1,
                        trimmed.trim_end().chars().count(),
                    )));
                }
                None => blocks.push(Block::Code {
                    info: info.to_owned(),
                    content: body.join("\n"),
                    line: line_no,
                }),
            }
            i = close.map_or(lines.len(), |c| c + 1);
        } else if let Some((level, text)) = parse_atx_heading(trimmed) {
            chunk.flush(&mut blocks);
            blocks.push(Block::Heading {
                level,
                text: text.to_owned(),
                line: line_no,
            });
            i += 1;
        } else {
            chunk.push(line, line_no);
            i += 1;
        }
    }

    chunk.flush(&mut blocks);
    blocks
}

fn scan_directive(
    name: &str,
    fence: DirectiveFence,
    body: &[&str],
    line: usize,
    column: usize,
    length: usize,
) -> DirectiveBlock {
    let mut properties = DirectiveProperties::default();
    let mut consumed = 0;
    for option_line in body {
        match parse_option(option_line.trim()) {
            Some((key, value)) => {
                properties.insert(key, value);
                consumed += 1;
            }
            None => break,
        }
    }

    DirectiveBlock {
        name: name.to_owned(),
        fence,
        properties,
        children: scan_lines(&body[consumed..], line + 1 + consumed),
        line,
        column,
        length,
    }
}

/// Extract the directive name and arguments from a fence info string.
///
/// `{name} args` is a directive for any fence; colon fences also accept a
/// bare `name args`.
fn directive_name(info: &str, delimiter: char) -> Option<(&str, &str)> {
    if let Some(rest) = info.strip_prefix('{') {
        let end = rest.find('}')?;
        let name = rest[..end].trim();
        if name.is_empty() {
            return None;
        }
        return Some((name, rest[end + 1..].trim()));
    }
    if delimiter == ':' && !info.is_empty() {
        let (name, arguments) = info.split_once(char::is_whitespace).unwrap_or((info, ""));
        return Some((name, arguments.trim()));
    }
    None
}

/// Parse a `:key: value` option line.
fn parse_option(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let end = rest.find(':')?;
    let key = &rest[..end];
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key, rest[end + 1..].trim()))
}

/// Parse an ATX heading: one to six `#` followed by whitespace or end of line.
fn parse_atx_heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    // Optional closing sequence: `## Title ##`
    let text = match text.trim_end_matches('#') {
        stripped if stripped.is_empty() || stripped.ends_with(char::is_whitespace) => {
            stripped.trim_end()
        }
        _ => text,
    };
    u8::try_from(level).ok().map(|level| (level, text))
}

#[derive(Default)]
struct ChunkBuilder<'a> {
    lines: Vec<&'a str>,
    start: usize,
    comments: Vec<usize>,
}

impl<'a> ChunkBuilder<'a> {
    fn push(&mut self, line: &'a str, line_no: usize) {
        if self.lines.is_empty() {
            self.start = line_no;
        }
        self.lines.push(line);
    }

    /// Drop a comment line without ending the chunk.
    fn skip(&mut self, line_no: usize) {
        if !self.lines.is_empty() {
            self.comments.push(line_no);
        }
    }

    fn flush(&mut self, blocks: &mut Vec<Block>) {
        if self.lines.iter().any(|l| !l.trim().is_empty()) {
            // Leading blank lines do not belong to the chunk's position.
            let leading = self
                .lines
                .iter()
                .take_while(|l| l.trim().is_empty())
                .count();
            blocks.push(Block::Markdown {
                text: self.lines[leading..].join("\n"),
                line: self.start + leading,
                comments: std::mem::take(&mut self.comments),
            });
        }
        self.lines.clear();
        self.comments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_headings_and_markdown() {
        let blocks = scan("# Title\n\nSome text\nmore text\n## Next ##\n", 1);

        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Title".to_owned(),
                    line: 1
                },
                Block::Markdown {
                    text: "Some text\nmore text".to_owned(),
                    line: 3,
                    comments: Vec::new(),
                },
                Block::Heading {
                    level: 2,
                    text: "Next".to_owned(),
                    line: 5
                },
            ]
        );
    }

    #[test]
    fn test_hash_without_space_is_text() {
        let blocks = scan("#hashtag\n", 1);
        assert!(matches!(blocks[0], Block::Markdown { .. }));
    }

    #[test]
    fn test_scan_directive_with_options() {
        let source = "```{note} Read this\n:class: wide\n:open:\nBody *text*\n```\n";
        let blocks = scan(source, 10);

        let Block::Directive(directive) = &blocks[0] else {
            panic!("expected directive, got {blocks:?}");
        };
        assert_eq!(directive.name, "note");
        assert_eq!(directive.line, 10);
        assert_eq!(directive.column, 1);
        assert_eq!(directive.fence.delimiter, '`');
        assert_eq!(directive.fence.count, 3);
        assert_eq!(directive.fence.info, "{note} Read this");
        assert_eq!(directive.fence.arguments, "Read this");
        assert_eq!(directive.properties.get("class"), Some("wide"));
        assert_eq!(directive.properties.get("open"), Some(""));
        assert_eq!(
            directive.children,
            vec![Block::Markdown {
                text: "Body *text*".to_owned(),
                line: 13,
                comments: Vec::new(),
            }]
        );
    }

    #[test]
    fn test_nested_directives() {
        let source = "::::{note}\n:::{tip}\ninner\n:::\n::::\nafter\n";
        let blocks = scan(source, 1);

        assert_eq!(blocks.len(), 2);
        let Block::Directive(outer) = &blocks[0] else {
            panic!("expected directive");
        };
        let Block::Directive(inner) = &outer.children[0] else {
            panic!("expected nested directive");
        };
        assert_eq!(inner.name, "tip");
        assert_eq!(inner.line, 2);
        assert_eq!(blocks[1].line(), 6);
    }

    #[test]
    fn test_code_fence_content_is_not_scanned() {
        let source = "```yaml\n# not a heading\n% not a comment\n```\n";
        let blocks = scan(source, 1);

        assert_eq!(
            blocks,
            vec![Block::Code {
                info: "yaml".to_owned(),
                content: "# not a heading\n% not a comment".to_owned(),
                line: 1
            }]
        );
    }

    #[test]
    fn test_comment_lines_are_dropped_from_chunk() {
        let source = "% leading\n- one\n% - hidden\n- two\n";
        let blocks = scan(source, 1);

        assert_eq!(
            blocks,
            vec![Block::Markdown {
                text: "- one\n- two".to_owned(),
                line: 2,
                comments: vec![3],
            }]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let blocks = scan(":::{warning}\nstill inside\n", 1);
        let Block::Directive(directive) = &blocks[0] else {
            panic!("expected directive");
        };
        assert_eq!(directive.children.len(), 1);
    }

    #[test]
    fn test_bare_colon_directive_name() {
        let blocks = scan(":::tip Quick\nbody\n:::\n", 1);
        let Block::Directive(directive) = &blocks[0] else {
            panic!("expected directive");
        };
        assert_eq!(directive.name, "tip");
        assert_eq!(directive.fence.arguments, "Quick");
    }
}
