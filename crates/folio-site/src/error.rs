use std::path::PathBuf;

/// Error aborting a documentation build.
///
/// Problems inside documents are diagnostics, not errors; these variants cover
/// infrastructure failures only.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration or docset could not be loaded.
    #[error(transparent)]
    Config(#[from] folio_config::ConfigError),
    /// The source directory does not exist.
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Reading a file or directory failed.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing to the output directory failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Serializing build state failed.
    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// More files failed than the configured limit allows.
    #[error("Aborting: more than {0} files failed to process")]
    TooManyFailures(usize),
    /// The diagnostics channel was cancelled mid-build.
    #[error("Build cancelled")]
    Cancelled,
}

impl BuildError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }
}
