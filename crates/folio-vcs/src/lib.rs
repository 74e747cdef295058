//! Git checkout information for Folio.
//!
//! The build records which branch, remote and commit produced the output so
//! that downstream tooling can tell builds apart. [`GitCheckout::discover`]
//! reads this from the repository enclosing the documentation source.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Branch name recorded for a detached `HEAD`.
pub const DETACHED_HEAD: &str = "detached/head";

/// Placeholder for values that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Error reading git information.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// No repository encloses the path.
    #[error("{} is not inside a git repository: {source}", path.display())]
    NotARepository {
        path: PathBuf,
        #[source]
        source: Box<gix::discover::Error>,
    },
    /// `HEAD` could not be read.
    #[error("failed to read HEAD: {0}")]
    Head(String),
}

/// Branch, remote and commit of a checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCheckout {
    pub branch: String,
    pub remote: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl GitCheckout {
    /// Read checkout information from the repository enclosing `path`.
    ///
    /// The remote is the URL tracked by the current branch, falling back to
    /// the remotes tracked by `main` and `master`, then to the
    /// `GITHUB_REPOSITORY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if no repository is found or `HEAD` is unreadable.
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::NotARepository {
            path: path.to_owned(),
            source: Box::new(e),
        })?;

        let branch = match repo.head_name().map_err(|e| GitError::Head(e.to_string()))? {
            Some(name) => name.shorten().to_string(),
            None => DETACHED_HEAD.to_owned(),
        };

        let git_ref = match repo.head_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                tracing::debug!(error = %e, "HEAD does not point to a commit");
                String::new()
            }
        };

        let config = repo.config_snapshot();
        let remote = tracking_remote(&branch, |key| config.string(key).map(|v| v.to_string()))
            .unwrap_or_else(fallback_remote);

        tracing::debug!(%branch, %remote, %git_ref, "Read git checkout");
        Ok(Self {
            branch,
            remote,
            git_ref,
        })
    }

    /// Checkout information for sources outside of git.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            branch: UNKNOWN.to_owned(),
            remote: fallback_remote(),
            git_ref: UNKNOWN.to_owned(),
        }
    }
}

/// Remote URL tracked by `branch`, then by `main`, then by `master`.
fn tracking_remote(branch: &str, get: impl Fn(&str) -> Option<String>) -> Option<String> {
    [branch, "main", "master"].into_iter().find_map(|b| {
        let name = get(&format!("branch.{b}.remote")).filter(|n| !n.is_empty())?;
        get(&format!("remote.{name}.url")).filter(|url| !url.is_empty())
    })
}

fn fallback_remote() -> String {
    std::env::var("GITHUB_REPOSITORY")
        .ok()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}
