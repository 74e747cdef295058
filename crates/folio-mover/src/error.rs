use std::path::PathBuf;

/// Error aborting a move.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("Source path '{}' does not exist", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Source path '{}' must be a markdown file", .0.display())]
    SourceNotMarkdown(PathBuf),
    #[error("Target path '{}' must be a markdown file", .0.display())]
    TargetNotMarkdown(PathBuf),
    #[error("Target path '{}' already exists", .0.display())]
    TargetExists(PathBuf),
    /// A directory cannot be moved into itself.
    #[error("Cannot move directory '{}' into '{}'", from.display(), to.display())]
    TargetInsideSource { from: PathBuf, to: PathBuf },
    /// Both paths must live under the documentation source directory.
    #[error("Path '{}' is outside the documentation set at '{}'", path.display(), root.display())]
    OutsideDocumentationSet { path: PathBuf, root: PathBuf },
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MoveError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }
}
