//! The documentation set: every source file, classified and placed in the
//! navigation tree.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use folio_config::{Config, Docset};
use folio_diagnostics::DiagnosticsCollector;
use folio_renderer::{LinkTarget, MarkdownParser, PageLookup, PageMeta};

use crate::error::BuildError;
use crate::file::{DocumentationFile, classify, scan};
use crate::navigation::NavigationTree;

/// Name of the incremental build state file in the output directory.
pub const STATE_FILENAME: &str = ".doc.state";

/// Name of the link reference file in the output directory.
pub const LINK_REFERENCE_FILENAME: &str = "links.json";

/// Source files of one documentation project.
#[derive(Debug)]
pub struct DocumentationSet {
    source_dir: PathBuf,
    output_dir: PathBuf,
    docset: Docset,
    files: BTreeMap<String, DocumentationFile>,
    last_write: DateTime<Utc>,
    tree: NavigationTree,
}

impl DocumentationSet {
    /// Load the docset named by the configuration and scan its sources.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the docset cannot be loaded or the source
    /// directory cannot be read.
    pub fn load(config: &Config, collector: &DiagnosticsCollector) -> Result<Self, BuildError> {
        let docs = &config.docs_resolved;
        let docset = Docset::load(&docs.docset_path())?;
        Self::new(
            docs.source_dir.clone(),
            docs.output_dir.clone(),
            docset,
            collector,
        )
    }

    /// Scan `source_dir`, classify every file and build the navigation tree.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the source directory cannot be read.
    pub fn new(
        source_dir: PathBuf,
        output_dir: PathBuf,
        docset: Docset,
        collector: &DiagnosticsCollector,
    ) -> Result<Self, BuildError> {
        let sources = scan(&source_dir, Some(&output_dir))?;
        let last_write = sources
            .iter()
            .map(|s| s.modified)
            .max()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut files = BTreeMap::new();
        let mut folders: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for source in sources {
            let file = classify(source, &docset, collector);
            let path = file.relative_path().to_owned();
            let mut folder = path.as_str();
            while let Some((parent, _)) = folder.rsplit_once('/') {
                folders.entry(parent.to_owned()).or_default().push(path.clone());
                folder = parent;
            }
            files.insert(path, file);
        }

        let docset_path = docset.path.display().to_string();
        let tree = NavigationTree::build(&docset.toc, &files, &folders, &docset_path, collector);

        tracing::info!(
            source_dir = %source_dir.display(),
            files = files.len(),
            %last_write,
            "Loaded documentation set"
        );

        Ok(Self {
            source_dir,
            output_dir,
            docset,
            files,
            last_write,
            tree,
        })
    }

    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn docset(&self) -> &Docset {
        &self.docset
    }

    /// Project name from the docset, else the source directory name.
    #[must_use]
    pub fn name(&self) -> String {
        self.docset.project.clone().unwrap_or_else(|| {
            self.source_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// All files keyed by relative path.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, DocumentationFile> {
        &self.files
    }

    /// Newest modification time across all source files.
    #[must_use]
    pub fn last_write(&self) -> DateTime<Utc> {
        self.last_write
    }

    #[must_use]
    pub fn tree(&self) -> &NavigationTree {
        &self.tree
    }

    /// Markdown page reachable through the TOC.
    #[must_use]
    pub fn markdown_file(&self, relative_path: &str) -> Option<&DocumentationFile> {
        self.files.get(relative_path).filter(|f| f.is_markdown())
    }

    /// Relative paths of all markdown pages, sorted.
    pub fn markdown_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .values()
            .filter(|f| f.is_markdown())
            .map(DocumentationFile::relative_path)
    }

    /// Previous visible page in navigation order.
    #[must_use]
    pub fn previous(&self, relative_path: &str) -> Option<&str> {
        self.tree.previous(relative_path)
    }

    /// Next visible page in navigation order.
    #[must_use]
    pub fn next(&self, relative_path: &str) -> Option<&str> {
        self.tree.next(relative_path)
    }

    /// Resolve titles and front matter of all pages.
    ///
    /// Unreadable pages are skipped; they are reported when rendered.
    pub fn resolve(&self) -> &HashMap<String, PageMeta> {
        self.tree.resolve(|path| {
            let file = self.files.get(path)?;
            match fs::read_to_string(&file.source().path) {
                Ok(source) => Some(MarkdownParser::minimal_parse(&source)),
                Err(e) => {
                    tracing::warn!(path, error = %e, "Failed to read page for title");
                    None
                }
            }
        })
    }

    /// Path of the incremental state file.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.output_dir.join(STATE_FILENAME)
    }

    /// Path of the link reference file.
    #[must_use]
    pub fn link_reference_file(&self) -> PathBuf {
        self.output_dir.join(LINK_REFERENCE_FILENAME)
    }

    /// Remove and recreate the output directory.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Write`] if the directory cannot be removed or created.
    pub fn clear_output_directory(&self) -> Result<(), BuildError> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir).map_err(BuildError::write(&self.output_dir))?;
        }
        fs::create_dir_all(&self.output_dir).map_err(BuildError::write(&self.output_dir))
    }
}

impl PageLookup for DocumentationSet {
    fn lookup(&self, relative_path: &str) -> Option<LinkTarget> {
        let file = self.files.get(relative_path)?;
        let title = file
            .is_markdown()
            .then(|| self.tree.resolved())
            .flatten()
            .and_then(|pages| pages.get(relative_path))
            .and_then(|meta| meta.title.clone());
        Some(LinkTarget { title })
    }
}
