//! Incremental build state and planning.
//!
//! After each successful generation the output directory receives a
//! `.doc.state` file recording the newest source modification time, the files
//! that produced diagnostics and the git checkout. The next build compares
//! against it to decide how much work is needed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use folio_vcs::GitCheckout;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Persisted outcome of the previous generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    /// Newest source modification time seen by the build.
    pub last_seen_changes: DateTime<Utc>,
    /// Files that produced errors or warnings.
    pub invalid_files: Vec<String>,
    pub git: GitCheckout,
    /// Cross-links recorded per page, for pages that have any.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cross_links: BTreeMap<String, Vec<String>>,
}

impl GenerationState {
    /// Read a state file.
    ///
    /// Returns `None` when the file is absent or unreadable; an unreadable
    /// state only costs a full rebuild.
    #[must_use]
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read build state");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid build state");
                None
            }
        }
    }

    /// Every recorded cross-link, sorted and deduplicated.
    #[must_use]
    pub fn all_cross_links(&self) -> Vec<String> {
        let links: BTreeSet<&String> = self.cross_links.values().flatten().collect();
        links.into_iter().cloned().collect()
    }

    /// Write the state file.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), BuildError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| BuildError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(BuildError::write(path))
    }
}

/// How much of the documentation set to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildPlan {
    /// Process every file.
    Full,
    /// Process files changed after `since` and files that had diagnostics.
    Incremental {
        since: DateTime<Utc>,
        offending: BTreeSet<String>,
    },
    /// Nothing changed.
    Skip,
}

impl BuildPlan {
    /// Whether a file must be processed under this plan.
    #[must_use]
    pub fn should_process(&self, relative_path: &str, modified: DateTime<Utc>) -> bool {
        match self {
            Self::Full => true,
            Self::Incremental { since, offending } => {
                offending.contains(relative_path) || modified > *since
            }
            Self::Skip => false,
        }
    }
}

/// Decide how to build given the previous state.
///
/// # Arguments
///
/// * `prior` - State of the previous generation, if any
/// * `last_write` - Newest source modification time now
/// * `git` - Current checkout
/// * `force` - Rebuild everything regardless of state
#[must_use]
pub fn plan(
    prior: Option<&GenerationState>,
    last_write: DateTime<Utc>,
    git: &GitCheckout,
    force: bool,
) -> BuildPlan {
    let Some(prior) = prior else {
        tracing::info!("Full compilation: no previous build state");
        return BuildPlan::Full;
    };
    if force {
        tracing::info!("Full compilation: --force was specified");
        return BuildPlan::Full;
    }
    if *git != prior.git {
        tracing::info!(
            current = ?git,
            previous = ?prior.git,
            "Full compilation: git checkout changed"
        );
        return BuildPlan::Full;
    }

    let offending: BTreeSet<String> = prior.invalid_files.iter().cloned().collect();
    if !offending.is_empty() || last_write > prior.last_seen_changes {
        tracing::info!(
            since = %prior.last_seen_changes,
            offending = offending.len(),
            "Incremental compilation"
        );
        return BuildPlan::Incremental {
            since: prior.last_seen_changes,
            offending,
        };
    }

    tracing::info!(
        since = %prior.last_seen_changes,
        "No compilation: no changes since last build. Pass --force to force a full regeneration"
    );
    BuildPlan::Skip
}
