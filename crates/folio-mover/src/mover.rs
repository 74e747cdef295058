//! Move validation, planning and application.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use folio_renderer::resolve_relative_path;
use folio_site::DocumentationSet;

use crate::error::MoveError;
use crate::rewrite::rewrite_links;

/// A single file relocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSet {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// New content for a file, kept with the original for rollback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub file: PathBuf,
    pub original_content: String,
    pub new_content: String,
}

/// A link rewritten by a move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkModification {
    pub old_link: String,
    pub new_link: String,
    /// File containing the link, at its location after the move.
    pub source_file: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

/// Result of a move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub change_sets: Vec<ChangeSet>,
    pub modifications: Vec<LinkModification>,
}

/// Every change a move will make, computed before touching the disk.
#[derive(Clone, Debug, Default)]
pub struct MovePlan {
    pub change_sets: Vec<ChangeSet>,
    pub changes: Vec<Change>,
    pub modifications: Vec<LinkModification>,
}

/// Moves markdown files within a documentation set and rewrites links to them.
pub struct Move {
    source_dir: PathBuf,
    markdown: Vec<String>,
}

impl Move {
    /// Create a mover for the markdown pages of a documentation set.
    #[must_use]
    pub fn new(set: &DocumentationSet) -> Self {
        Self::from_files(
            set.source_dir(),
            set.markdown_paths().map(str::to_owned),
        )
    }

    /// Create a mover from a source directory and the relative paths of the
    /// markdown files whose links should be kept up to date.
    #[must_use]
    pub fn from_files(
        source_dir: impl Into<PathBuf>,
        markdown: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            markdown: markdown.into_iter().collect(),
        }
    }

    /// Move `source` to `target`, rewriting links along the way.
    ///
    /// With `dry_run` the same modifications are computed and returned but
    /// nothing is written. Line and column refer to the file before the move.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] if validation fails or the files cannot be
    /// read, written or moved. A failed single-file move is rolled back.
    pub fn execute(
        &self,
        source: &Path,
        target: &Path,
        dry_run: bool,
    ) -> Result<MoveOutcome, MoveError> {
        if dry_run {
            tracing::info!("Running in dry-run mode");
        }

        let plan = self.plan(source, target)?;
        if !dry_run {
            plan.apply()?;
        }

        Ok(MoveOutcome {
            change_sets: plan.change_sets,
            modifications: plan.modifications,
        })
    }

    /// Validate a move and compute all rewrites in memory.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] if validation fails or a file cannot be read.
    pub fn plan(&self, source: &Path, target: &Path) -> Result<MovePlan, MoveError> {
        let pairs = self.validate(source, target)?;
        let moves: BTreeMap<String, String> = pairs.iter().cloned().collect();

        let mut plan = MovePlan::default();
        for (from, to) in &pairs {
            tracing::info!(from = %from, to = %to, "Requested to move");
            plan.change_sets.push(ChangeSet {
                from: self.source_dir.join(from),
                to: self.source_dir.join(to),
            });
        }

        let files: BTreeSet<&String> = self.markdown.iter().chain(moves.keys()).collect();
        for path in files {
            let file = self.source_dir.join(path);
            let content = fs::read_to_string(&file).map_err(MoveError::read(&file))?;
            let location = moves.get(path).unwrap_or(path);

            let (new_content, rewrites) = rewrite_links(&content, path, location, &moves);
            let source_file = self.source_dir.join(location);
            plan.modifications
                .extend(rewrites.into_iter().map(|rewrite| LinkModification {
                    old_link: rewrite.old_link,
                    new_link: rewrite.new_link,
                    source_file: source_file.clone(),
                    line: rewrite.line,
                    column: rewrite.column,
                }));

            if new_content != content {
                plan.changes.push(Change {
                    file,
                    original_content: content,
                    new_content,
                });
            }
        }

        Ok(plan)
    }

    /// Check the request and expand it into relative `(from, to)` pairs.
    fn validate(&self, source: &Path, target: &Path) -> Result<Vec<(String, String)>, MoveError> {
        if source.is_file() {
            if !is_markdown(source) {
                return Err(MoveError::SourceNotMarkdown(source.to_path_buf()));
            }
            let target = match (target.extension(), source.file_name()) {
                (None, Some(name)) => target.join(name),
                _ => target.to_path_buf(),
            };
            if !is_markdown(&target) {
                return Err(MoveError::TargetNotMarkdown(target));
            }
            if target.exists() {
                return Err(MoveError::TargetExists(target));
            }
            return Ok(vec![(self.relative(source)?, self.relative(&target)?)]);
        }

        if !source.is_dir() {
            return Err(MoveError::SourceNotFound(source.to_path_buf()));
        }
        if target.exists() {
            return Err(MoveError::TargetExists(target.to_path_buf()));
        }
        let from = self.relative(source)?;
        let to = self.relative(target)?;
        if from.is_empty() || to == from || to.starts_with(&format!("{from}/")) {
            return Err(MoveError::TargetInsideSource {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        list_markdown(source, "", &mut files)?;
        files.sort();
        Ok(files
            .into_iter()
            .map(|file| (format!("{from}/{file}"), format!("{to}/{file}")))
            .collect())
    }

    /// Path relative to the source directory, forward-slash separated.
    fn relative(&self, path: &Path) -> Result<String, MoveError> {
        let root = std::path::absolute(&self.source_dir).map_err(MoveError::read(&self.source_dir))?;
        let absolute = std::path::absolute(path).map_err(MoveError::read(path))?;
        let relative =
            absolute
                .strip_prefix(&root)
                .map_err(|_| MoveError::OutsideDocumentationSet {
                    path: path.to_path_buf(),
                    root: self.source_dir.clone(),
                })?;
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Ok(resolve_relative_path(&joined, ""))
    }
}

impl MovePlan {
    /// Write the changed files, then move each file into place.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] on the first failure. When a single file is
    /// being moved, its move and every content change are reverted first;
    /// larger batches may be left partially applied.
    pub fn apply(&self) -> Result<(), MoveError> {
        let Err(err) = self.write_and_move() else {
            return Ok(());
        };

        if self.change_sets.len() > 1 {
            tracing::error!(
                error = %err,
                "An error occurred while moving files. Can only revert a single file move"
            );
            return Err(err);
        }

        tracing::error!(error = %err, "An error occurred while moving files. Reverting changes");
        self.revert();
        Err(err)
    }

    fn write_and_move(&self) -> Result<(), MoveError> {
        for change in &self.changes {
            fs::write(&change.file, &change.new_content).map_err(MoveError::write(&change.file))?;
        }
        for set in &self.change_sets {
            if let Some(parent) = set.to.parent() {
                fs::create_dir_all(parent).map_err(MoveError::write(parent))?;
            }
            move_file(&set.from, &set.to)?;
        }
        Ok(())
    }

    /// Best-effort rollback; failures are logged.
    fn revert(&self) {
        for set in &self.change_sets {
            if !set.to.exists() {
                continue;
            }
            let result = if set.from.exists() {
                fs::remove_file(&set.to)
            } else {
                fs::rename(&set.to, &set.from)
                    .or_else(|_| fs::copy(&set.to, &set.from).and_then(|_| fs::remove_file(&set.to)))
            };
            if let Err(e) = result {
                tracing::error!(path = %set.to.display(), error = %e, "Failed to revert move");
            }
        }
        for change in &self.changes {
            if let Err(e) = fs::write(&change.file, &change.original_content) {
                tracing::error!(path = %change.file.display(), error = %e, "Failed to restore file");
            }
        }
    }
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<(), MoveError> {
    fs::rename(from, to)
        .or_else(|_| fs::copy(from, to).and_then(|_| fs::remove_file(from)))
        .map_err(|source| MoveError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn list_markdown(dir: &Path, prefix: &str, files: &mut Vec<String>) -> Result<(), MoveError> {
    for entry in fs::read_dir(dir).map_err(MoveError::read(dir))? {
        let entry = entry.map_err(MoveError::read(dir))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if path.is_dir() {
            list_markdown(&path, &relative, files)?;
        } else if is_markdown(&path) {
            files.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use folio_config::Docset;
    use folio_diagnostics::DiagnosticsCollector;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn docs(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("docs");
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        (dir, root)
    }

    fn mover(root: &Path) -> Move {
        let mut markdown = Vec::new();
        list_markdown(root, "", &mut markdown).unwrap();
        markdown.sort();
        Move::from_files(root, markdown)
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_move_file_rewrites_sibling_link() {
        let (_dir, root) = docs(&[
            ("a/b.md", "# B\n"),
            ("a/index.md", "# Index\n\nSee [x](b.md#anchor).\n"),
        ]);

        let outcome = mover(&root)
            .execute(&root.join("a/b.md"), &root.join("a/c/b.md"), false)
            .unwrap();

        assert_eq!(
            outcome.modifications,
            vec![LinkModification {
                old_link: "[x](b.md#anchor)".to_owned(),
                new_link: "[x](c/b.md#anchor)".to_owned(),
                source_file: root.join("a/index.md"),
                line: 3,
                column: 5,
            }]
        );
        assert_eq!(read(root.join("a/index.md")), "# Index\n\nSee [x](c/b.md#anchor).\n");
        assert!(!root.join("a/b.md").exists());
        assert_eq!(read(root.join("a/c/b.md")), "# B\n");
    }

    #[test]
    fn test_move_file_rewrites_own_links() {
        let (_dir, root) = docs(&[
            ("guide/setup.md", "[home](../index.md) [abs](/index.md)\n"),
            ("index.md", "[setup](/guide/setup.md)\n"),
        ]);

        let outcome = mover(&root)
            .execute(&root.join("guide/setup.md"), &root.join("setup.md"), false)
            .unwrap();

        assert_eq!(read(root.join("setup.md")), "[home](index.md) [abs](/index.md)\n");
        assert_eq!(read(root.join("index.md")), "[setup](/setup.md)\n");
        let moved = outcome
            .modifications
            .iter()
            .find(|m| m.old_link == "[home](../index.md)")
            .unwrap();
        assert_eq!(moved.source_file, root.join("setup.md"));
    }

    #[test]
    fn test_move_into_directory_keeps_file_name() {
        let (_dir, root) = docs(&[("a.md", "# A\n"), ("index.md", "[a](./a.md)\n")]);

        let outcome = mover(&root)
            .execute(&root.join("a.md"), &root.join("archive"), false)
            .unwrap();

        assert_eq!(outcome.change_sets[0].to, root.join("archive/a.md"));
        assert_eq!(read(root.join("index.md")), "[a](./archive/a.md)\n");
    }

    #[test]
    fn test_dry_run_matches_real_run() {
        let files = [
            ("a/b.md", "[up](../index.md) [me](b.md) [c](c.md)\n"),
            ("a/c.md", "# C\n"),
            ("index.md", "[b](a/b.md) [b again](/a/b.md)\n"),
        ];
        let (_dir, root) = docs(&files);

        let dry = mover(&root)
            .execute(&root.join("a/b.md"), &root.join("z/b.md"), true)
            .unwrap();

        assert!(root.join("a/b.md").exists());
        assert!(!root.join("z").exists());
        assert_eq!(read(root.join("index.md")), files[2].1);

        let real = mover(&root)
            .execute(&root.join("a/b.md"), &root.join("z/b.md"), false)
            .unwrap();

        assert_eq!(dry, real);
        assert_eq!(
            real.modifications,
            vec![
                LinkModification {
                    old_link: "[c](c.md)".to_owned(),
                    new_link: "[c](../a/c.md)".to_owned(),
                    source_file: root.join("z/b.md"),
                    line: 1,
                    column: 30,
                },
                LinkModification {
                    old_link: "[b](a/b.md)".to_owned(),
                    new_link: "[b](z/b.md)".to_owned(),
                    source_file: root.join("index.md"),
                    line: 1,
                    column: 1,
                },
                LinkModification {
                    old_link: "[b again](/a/b.md)".to_owned(),
                    new_link: "[b again](/z/b.md)".to_owned(),
                    source_file: root.join("index.md"),
                    line: 1,
                    column: 13,
                },
            ]
        );
        assert_eq!(
            read(root.join("z/b.md")),
            "[up](../index.md) [me](b.md) [c](../a/c.md)\n"
        );
    }

    #[test]
    fn test_move_directory() {
        let (_dir, root) = docs(&[
            ("guide/a.md", "[b](b.md) [top](../index.md)\n"),
            ("guide/b.md", "[a](./a.md)\n"),
            ("guide/logo.png", "png"),
            ("index.md", "[a](guide/a.md) [b](guide/b.md#x)\n"),
        ]);

        let outcome = mover(&root)
            .execute(&root.join("guide"), &root.join("manual/guide"), false)
            .unwrap();

        assert_eq!(outcome.change_sets.len(), 2);
        assert_eq!(read(root.join("manual/guide/a.md")), "[b](b.md) [top](../../index.md)\n");
        assert_eq!(read(root.join("manual/guide/b.md")), "[a](./a.md)\n");
        assert_eq!(
            read(root.join("index.md")),
            "[a](manual/guide/a.md) [b](manual/guide/b.md#x)\n"
        );
        assert!(root.join("guide/logo.png").exists());
    }

    #[test]
    fn test_move_uses_documentation_set_pages() {
        let (dir, root) = docs(&[("index.md", "[a](a.md)\n"), ("a.md", "# A\n")]);
        let docset = Docset::parse(
            "toc:\n  - file: index.md\n  - file: a.md\n",
            &root.join("docset.yml"),
        )
        .unwrap();
        let collector = DiagnosticsCollector::new(Vec::new());
        let set = DocumentationSet::new(root.clone(), dir.path().join("out"), docset, &collector)
            .unwrap();

        Move::new(&set)
            .execute(&root.join("a.md"), &root.join("b.md"), false)
            .unwrap();

        assert_eq!(read(root.join("index.md")), "[a](b.md)\n");
    }

    #[test]
    fn test_validation_errors() {
        let (_dir, root) = docs(&[
            ("a.md", ""),
            ("b.md", ""),
            ("notes.txt", ""),
            ("guide/c.md", ""),
            ("other/d.md", ""),
        ]);
        let mover = mover(&root);

        assert!(matches!(
            mover.plan(&root.join("missing.md"), &root.join("x.md")),
            Err(MoveError::SourceNotFound(_))
        ));
        assert!(matches!(
            mover.plan(&root.join("notes.txt"), &root.join("x.md")),
            Err(MoveError::SourceNotMarkdown(_))
        ));
        assert!(matches!(
            mover.plan(&root.join("a.md"), &root.join("x.txt")),
            Err(MoveError::TargetNotMarkdown(_))
        ));
        assert!(matches!(
            mover.plan(&root.join("a.md"), &root.join("b.md")),
            Err(MoveError::TargetExists(_))
        ));
        assert!(matches!(
            mover.plan(&root.join("guide"), &root.join("other")),
            Err(MoveError::TargetExists(_))
        ));
        assert!(matches!(
            mover.plan(&root.join("guide"), &root.join("guide/nested")),
            Err(MoveError::TargetInsideSource { .. })
        ));
        assert!(matches!(
            mover.plan(&root.join("a.md"), &root.parent().unwrap().join("x.md")),
            Err(MoveError::OutsideDocumentationSet { .. })
        ));
    }

    #[test]
    fn test_failed_single_move_is_reverted() {
        let (_dir, root) = docs(&[("a.md", "# A\n"), ("index.md", "[a](a.md)\n")]);
        let mover = mover(&root);
        let plan = mover.plan(&root.join("a.md"), &root.join("sub/a.md")).unwrap();

        // A file where the target directory should be makes the move fail.
        fs::write(root.join("sub"), "").unwrap();

        assert!(plan.apply().is_err());
        assert_eq!(read(root.join("index.md")), "[a](a.md)\n");
        assert_eq!(read(root.join("a.md")), "# A\n");
    }
}
