//! Path and text helpers shared by the renderer and the mover.

/// Compute a relative link from one source file to another.
///
/// Both paths are relative to the source root, forward-slash separated.
/// The last segment of `from` is the current document, so the base directory
/// is everything before it.
///
/// # Examples
///
/// ```
/// use folio_renderer::relative_path;
///
/// assert_eq!(relative_path("a/x.md", "a/c/b.md"), "c/b.md");
/// assert_eq!(relative_path("a/b/x.md", "a/c.md"), "../c.md");
/// assert_eq!(relative_path("index.md", "guide/a.md"), "guide/a.md");
/// ```
#[must_use]
pub fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let from_dir = if from.ends_with('/') || from_segs.is_empty() {
        &from_segs[..]
    } else {
        &from_segs[..from_segs.len() - 1]
    };

    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups_part = "../".repeat(from_dir.len() - common);
    let down_part = to_segs[common..].join("/");

    let result = format!("{ups_part}{down_part}");
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}

/// Resolve a relative path against a base directory.
///
/// Handles `.` and `..` segments. `..` above the root is ignored.
///
/// ```
/// use folio_renderer::resolve_relative_path;
///
/// assert_eq!(resolve_relative_path("../b.md", "guide/nested"), "guide/b.md");
/// assert_eq!(resolve_relative_path("./c.md", ""), "c.md");
/// ```
#[must_use]
pub fn resolve_relative_path(relative: &str, base: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();

    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }

    segments.join("/")
}

/// Directory part of a relative file path (empty at the root).
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Escape text for inclusion in HTML content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build a heading anchor slug: lowercase alphanumerics separated by single dashes.
#[must_use]
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}
