//! `links.json`: the pages a build publishes and the cross-links it uses.
//!
//! Other documentation sets read this file to validate links into this one.

use std::fs;
use std::path::Path;

use folio_vcs::GitCheckout;
use serde::{Deserialize, Serialize};

use crate::doc_set::DocumentationSet;
use crate::error::BuildError;

/// Link reference written once per generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    /// Checkout that produced the build.
    pub origin: GitCheckout,
    pub url_path_prefix: Option<String>,
    /// Published pages, `.md` rewritten to `.html`.
    pub links: Vec<String>,
    /// Cross-links found in the pages, sorted and deduplicated.
    pub cross_links: Vec<String>,
}

impl LinkReference {
    /// Build the reference for a documentation set.
    #[must_use]
    pub fn create(
        set: &DocumentationSet,
        origin: GitCheckout,
        url_path_prefix: Option<String>,
        cross_links: Vec<String>,
    ) -> Self {
        let links = set
            .markdown_paths()
            .map(|path| match path.strip_suffix(".md") {
                Some(stem) => format!("{stem}.html"),
                None => path.to_owned(),
            })
            .collect();
        Self {
            origin,
            url_path_prefix,
            links,
            cross_links,
        }
    }

    /// Write as JSON.
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
