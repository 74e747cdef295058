//! Source file discovery and classification.
//!
//! Every file under the source directory becomes exactly one
//! [`DocumentationFile`], keyed by its forward-slash relative path:
//!
//! - `.jpg`, `.jpeg`, `.gif`, `.svg`, `.png` are images
//! - `.md` files are excluded when they match an exclusion glob, pages when
//!   the TOC lists them, snippets under `_snippets`, excluded when they live
//!   in an `_`-prefixed location, and otherwise excluded with an error
//! - everything else is a static file copied verbatim

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use folio_config::Docset;
use folio_diagnostics::DiagnosticsCollector;

use crate::error::BuildError;

/// A file found under the source directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the source root, `/`-separated.
    pub relative_path: String,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Classified source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentationFile {
    /// Page reachable through the TOC.
    Markdown(SourceFile),
    Image {
        source: SourceFile,
        mime_type: &'static str,
    },
    /// Copied to the output as-is.
    Static(SourceFile),
    /// Markdown left out of the build.
    Excluded(SourceFile),
    /// Markdown meant for inclusion in other pages.
    Snippet(SourceFile),
}

impl DocumentationFile {
    #[must_use]
    pub fn source(&self) -> &SourceFile {
        match self {
            Self::Markdown(source)
            | Self::Image { source, .. }
            | Self::Static(source)
            | Self::Excluded(source)
            | Self::Snippet(source) => source,
        }
    }

    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.source().relative_path
    }

    #[must_use]
    pub fn is_markdown(&self) -> bool {
        matches!(self, Self::Markdown(_))
    }

    /// Whether the file is written to the output directory.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Markdown(_) | Self::Image { .. } | Self::Static(_))
    }
}

/// Classify a source file against the docset.
///
/// Markdown neither listed in the TOC nor conventionally hidden is reported
/// as an error against the docset file.
pub(crate) fn classify(
    source: SourceFile,
    docset: &Docset,
    collector: &DiagnosticsCollector,
) -> DocumentationFile {
    let extension = Path::new(&source.relative_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let mime_type = match extension.as_deref() {
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("svg") => Some("image/svg+xml"),
        Some("png") => Some("image/png"),
        Some("md") => return classify_markdown(source, docset, collector),
        _ => None,
    };

    match mime_type {
        Some(mime_type) => DocumentationFile::Image { source, mime_type },
        None => DocumentationFile::Static(source),
    }
}

fn classify_markdown(
    source: SourceFile,
    docset: &Docset,
    collector: &DiagnosticsCollector,
) -> DocumentationFile {
    let path = source.relative_path.as_str();
    if docset.is_excluded(path) {
        return DocumentationFile::Excluded(source);
    }
    if docset.is_listed(path) {
        return DocumentationFile::Markdown(source);
    }
    if path.contains("_snippets") {
        return DocumentationFile::Snippet(source);
    }
    if path.starts_with('_') || path.contains("/_") {
        return DocumentationFile::Excluded(source);
    }

    collector.emit_error(
        docset.path.display().to_string(),
        format!("Not linked in toc: {path}"),
    );
    DocumentationFile::Excluded(source)
}

/// Recursively list files under `source_dir`, sorted by relative path.
///
/// Dot-prefixed entries and the `skip` directory (typically the output
/// directory when nested inside the sources) are ignored.
pub(crate) fn scan(source_dir: &Path, skip: Option<&Path>) -> Result<Vec<SourceFile>, BuildError> {
    if !source_dir.is_dir() {
        return Err(BuildError::SourceNotFound(source_dir.to_path_buf()));
    }
    let mut files = Vec::new();
    scan_directory(source_dir, "", skip, &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn scan_directory(
    dir: &Path,
    prefix: &str,
    skip: Option<&Path>,
    files: &mut Vec<SourceFile>,
) -> Result<(), BuildError> {
    let entries = fs::read_dir(dir).map_err(BuildError::read(dir))?;

    for entry in entries {
        let entry = entry.map_err(BuildError::read(dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let relative_path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let metadata = entry.metadata().map_err(BuildError::read(&path))?;

        if metadata.is_dir() {
            if skip.is_some_and(|s| s == path) {
                continue;
            }
            scan_directory(&path, &relative_path, skip, files)?;
        } else {
            let modified = metadata.modified().map_err(BuildError::read(&path))?;
            files.push(SourceFile {
                path,
                relative_path,
                modified: DateTime::<Utc>::from(modified),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn source(relative_path: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("/docs").join(relative_path),
            relative_path: relative_path.to_owned(),
            modified: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn docset() -> Docset {
        Docset::parse(
            "exclude:\n  - 'drafts/*.md'\ntoc:\n  - file: index.md\n  - folder: guide\n  - file: drafts/wip.md\n",
            Path::new("/docs/docset.yml"),
        )
        .unwrap()
    }

    fn kind(file: &DocumentationFile) -> &'static str {
        match file {
            DocumentationFile::Markdown(_) => "markdown",
            DocumentationFile::Image { .. } => "image",
            DocumentationFile::Static(_) => "static",
            DocumentationFile::Excluded(_) => "excluded",
            DocumentationFile::Snippet(_) => "snippet",
        }
    }

    #[test]
    fn test_classify() {
        let docset = docset();
        let collector = DiagnosticsCollector::new(Vec::new());

        let kinds: Vec<(&str, &str)> = [
            "index.md",
            "guide/setup.md",
            "drafts/wip.md",
            "_snippets/note.md",
            "guide/_partials/x.md",
            "_internal.md",
            "img/logo.PNG",
            "img/diagram.svg",
            "robots.txt",
        ]
        .into_iter()
        .map(|path| (path, kind(&classify(source(path), &docset, &collector))))
        .collect();

        assert_eq!(
            kinds,
            vec![
                ("index.md", "markdown"),
                ("guide/setup.md", "markdown"),
                ("drafts/wip.md", "excluded"),
                ("_snippets/note.md", "snippet"),
                ("guide/_partials/x.md", "excluded"),
                ("_internal.md", "excluded"),
                ("img/logo.PNG", "image"),
                ("img/diagram.svg", "image"),
                ("robots.txt", "static"),
            ]
        );
        assert_eq!(collector.stop().errors, 0);
    }

    #[test]
    fn test_image_mime_type() {
        let collector = DiagnosticsCollector::new(Vec::new());
        let file = classify(source("a/photo.jpeg"), &docset(), &collector);

        assert!(matches!(file, DocumentationFile::Image { mime_type: "image/jpeg", .. }));
        assert!(file.is_published());
    }

    #[test]
    fn test_unlisted_markdown_is_reported() {
        let collector = DiagnosticsCollector::new(Vec::new());
        let file = classify(source("orphan.md"), &docset(), &collector);

        assert!(matches!(file, DocumentationFile::Excluded(_)));
        let summary = collector.stop();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.diagnostics[0].file, "/docs/docset.yml");
        assert_eq!(summary.diagnostics[0].message, "Not linked in toc: orphan.md");
    }

    #[test]
    fn test_scan_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("out")).unwrap();
        fs::write(root.join("b/nested/z.md"), "").unwrap();
        fs::write(root.join("b/a.md"), "").unwrap();
        fs::write(root.join("index.md"), "").unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();
        fs::write(root.join("out/index.html"), "").unwrap();

        let files = scan(root, Some(&root.join("out"))).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(paths, vec!["b/a.md", "b/nested/z.md", "index.md"]);
        assert_eq!(files[0].path, root.join("b/a.md"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan(&dir.path().join("missing"), None);
        assert!(matches!(result, Err(BuildError::SourceNotFound(_))));
    }
}
