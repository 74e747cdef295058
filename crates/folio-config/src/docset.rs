//! `docset.yml` parsing.
//!
//! The docset declares the table of contents of a documentation set and the
//! glob patterns of files excluded from the build:
//!
//! ```yaml
//! project: Guide
//! exclude:
//!   - "drafts/**"
//! toc:
//!   - file: index.md
//!   - folder: setup
//!     children:
//!       - file: install.md
//!       - file: upgrade.md
//!         hidden: true
//!   - folder: reference
//! ```
//!
//! Child paths are relative to the enclosing folder, so the entries above
//! resolve to `setup/install.md` and `setup/upgrade.md`. Children of a file
//! entry share the file's parent folder. A folder without children is expanded
//! from disk when the navigation tree is built.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use crate::ConfigError;

/// Default docset filename inside the source directory.
pub const DOCSET_FILENAME: &str = "docset.yml";

/// Table-of-contents entry with a fully prefixed relative path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TocItem {
    /// A single page, optionally carrying nested pages.
    File {
        path: String,
        hidden: bool,
        children: Vec<TocItem>,
    },
    /// A folder; empty `children` means auto-expansion.
    Folder { path: String, children: Vec<TocItem> },
}

impl TocItem {
    /// Relative path of the entry.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Folder { path, .. } => path,
        }
    }

    /// Nested entries.
    #[must_use]
    pub fn children(&self) -> &[TocItem] {
        match self {
            Self::File { children, .. } | Self::Folder { children, .. } => children,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocsetRaw {
    project: Option<String>,
    exclude: Vec<String>,
    toc: Vec<TocEntryRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TocEntryRaw {
    file: Option<String>,
    folder: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    children: Vec<TocEntryRaw>,
}

/// Parsed documentation set configuration.
#[derive(Debug)]
pub struct Docset {
    /// Location of the docset file, used as the file of configuration diagnostics.
    pub path: PathBuf,
    /// Optional project title.
    pub project: Option<String>,
    /// Table of contents in authored order.
    pub toc: Vec<TocItem>,
    exclude: Vec<Pattern>,
    files: BTreeSet<String>,
    implicit_folders: BTreeSet<String>,
}

impl Docset {
    /// Load and parse a docset file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file is missing, or a parse or
    /// validation error for malformed content.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse docset YAML content.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Yaml` for malformed YAML and
    /// `ConfigError::Validation` for invalid entries or glob patterns.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: DocsetRaw = if content.trim().is_empty() {
            DocsetRaw::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let exclude = raw
            .exclude
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|e| {
                    ConfigError::Validation(format!("invalid exclude glob '{glob}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut files = BTreeSet::new();
        let mut implicit_folders = BTreeSet::new();
        let toc = convert_entries(raw.toc, "", &mut files, &mut implicit_folders)?;

        Ok(Self {
            path: path.to_path_buf(),
            project: raw.project,
            toc,
            exclude,
            files,
            implicit_folders,
        })
    }

    /// Check whether a relative path matches one of the exclusion globs.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(relative_path))
    }

    /// Check whether the TOC lists a file, explicitly or through a folder
    /// that is expanded from disk.
    #[must_use]
    pub fn is_listed(&self, relative_path: &str) -> bool {
        self.files.contains(relative_path)
            || self.implicit_folders.iter().any(|folder| {
                relative_path
                    .strip_prefix(folder.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    /// Files referenced explicitly by the TOC.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Folders declared without children.
    pub fn implicit_folders(&self) -> impl Iterator<Item = &str> {
        self.implicit_folders.iter().map(String::as_str)
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches("./").trim_matches('/');
    if prefix.is_empty() {
        path.to_owned()
    } else {
        format!("{prefix}/{path}")
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn convert_entries(
    entries: Vec<TocEntryRaw>,
    prefix: &str,
    files: &mut BTreeSet<String>,
    implicit_folders: &mut BTreeSet<String>,
) -> Result<Vec<TocItem>, ConfigError> {
    entries
        .into_iter()
        .map(|entry| convert_entry(entry, prefix, files, implicit_folders))
        .collect()
}

fn convert_entry(
    entry: TocEntryRaw,
    prefix: &str,
    files: &mut BTreeSet<String>,
    implicit_folders: &mut BTreeSet<String>,
) -> Result<TocItem, ConfigError> {
    match (entry.file, entry.folder) {
        (Some(file), None) => {
            let path = join_path(prefix, &file);
            files.insert(path.clone());
            let children =
                convert_entries(entry.children, parent_of(&path), files, implicit_folders)?;
            Ok(TocItem::File {
                path,
                hidden: entry.hidden,
                children,
            })
        }
        (None, Some(folder)) => {
            let path = join_path(prefix, &folder);
            if entry.hidden {
                return Err(ConfigError::Validation(format!(
                    "toc folder '{path}' cannot be hidden"
                )));
            }
            if entry.children.is_empty() {
                implicit_folders.insert(path.clone());
            }
            let children = convert_entries(entry.children, &path, files, implicit_folders)?;
            Ok(TocItem::Folder { path, children })
        }
        (Some(file), Some(folder)) => Err(ConfigError::Validation(format!(
            "toc entry declares both file '{file}' and folder '{folder}'"
        ))),
        (None, None) => Err(ConfigError::Validation(
            "toc entry must declare either file or folder".to_owned(),
        )),
    }
}
