//! Markdown link rewriting for moved files.
//!
//! All paths are relative to the documentation source directory and use
//! forward slashes. Rewrites operate on text so the surrounding markdown is
//! preserved byte for byte.
//!
//! Every link is rewritten at most once, from the original content, against
//! the complete set of moves. Line and column therefore always refer to the
//! file as it was before the move.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use folio_renderer::{parent_dir, relative_path, resolve_relative_path};
use regex::{Captures, Regex};

/// Local markdown links: text, path and optional anchor.
static LOCAL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(((?:\.{0,2}/)?[^:)#]+\.md)(#[^)]*)?\)").expect("invalid link regex")
});

/// A single link replaced in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Rewrite {
    pub old_link: String,
    pub new_link: String,
    pub line: usize,
    pub column: usize,
}

/// Rewrite the local links of a file that lives at `location` and ends up at
/// `new_location`, given every planned `old path -> new path` move.
///
/// - a root-absolute link changes only when its target moves
/// - a relative link is recomputed when its target or the file itself moves;
///   a leading `./` is kept when the new path allows it
///
/// `#anchor` fragments are carried over. Links whose text ends up identical
/// are not reported.
pub(crate) fn rewrite_links(
    content: &str,
    location: &str,
    new_location: &str,
    moves: &BTreeMap<String, String>,
) -> (String, Vec<Rewrite>) {
    let base = parent_dir(location);
    let mut rewrites = Vec::new();

    let replaced = LOCAL_LINK.replace_all(content, |caps: &Captures<'_>| {
        let old_link = caps[0].to_owned();
        let Some(path) = new_path(&caps[2], base, location != new_location, new_location, moves)
        else {
            return old_link;
        };
        let anchor = caps.get(3).map_or("", |m| m.as_str());
        let new_link = format!("[{}]({path}{anchor})", &caps[1]);
        if new_link != old_link {
            let start = caps.get(0).map_or(0, |m| m.start());
            let (line, column) = position(content, start);
            rewrites.push(Rewrite {
                old_link,
                new_link: new_link.clone(),
                line,
                column,
            });
        }
        new_link
    });
    (replaced.into_owned(), rewrites)
}

fn new_path(
    path: &str,
    base: &str,
    file_moved: bool,
    new_location: &str,
    moves: &BTreeMap<String, String>,
) -> Option<String> {
    if let Some(absolute) = path.strip_prefix('/') {
        let target = resolve_relative_path(absolute, "");
        return moves.get(&target).map(|to| format!("/{to}"));
    }

    let target = resolve_relative_path(path, base);
    let moved_to = moves.get(&target);
    if !file_moved && moved_to.is_none() {
        return None;
    }
    let to = moved_to.unwrap_or(&target);
    Some(keep_dot_slash(path, relative_path(new_location, to)))
}

fn keep_dot_slash(original: &str, path: String) -> String {
    if original.starts_with("./") && !path.starts_with('.') {
        format!("./{path}")
    } else {
        path
    }
}

/// 1-based line and column of a byte offset.
fn position(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}
