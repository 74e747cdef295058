//! Navigation tree built from the docset TOC.
//!
//! The tree is constructed in a single depth-first pass over the TOC in
//! authored order. Each reachable page receives a navigation index from a
//! counter threaded through the recursion, so indices are unique and strictly
//! increasing in pre-order. Groups live in a flat arena and refer to their
//! parent by [`GroupId`]; the tree is immutable once built.
//!
//! Configuration problems (missing or excluded TOC entries, hidden pages with
//! children, unreachable pages) are reported as errors against the docset file
//! and never abort construction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use folio_config::TocItem;
use folio_diagnostics::DiagnosticsCollector;
use folio_renderer::PageMeta;
use rayon::prelude::*;

use crate::file::DocumentationFile;

/// Index of a group in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// Entry shown in a group's navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationItem {
    File {
        /// Position within the TOC list that produced the item.
        order: usize,
        depth: usize,
        file: String,
    },
    Group {
        order: usize,
        depth: usize,
        group: GroupId,
    },
}

/// A level of the navigation tree.
#[derive(Clone, Debug, Default)]
pub struct DocumentationGroup {
    index: Option<String>,
    files: Vec<String>,
    own_files: HashSet<String>,
    groups: Vec<GroupId>,
    navigation_items: Vec<NavigationItem>,
    parent: Option<GroupId>,
    depth: usize,
}

impl DocumentationGroup {
    /// Landing page of the group.
    #[must_use]
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Pages in TOC order, without the index.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Nested groups in TOC order.
    #[must_use]
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    #[must_use]
    pub fn navigation_items(&self) -> &[NavigationItem] {
        &self.navigation_items
    }

    #[must_use]
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Position of a page in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationPage {
    /// Pre-order sequence number.
    pub navigation_index: usize,
    pub hidden: bool,
    /// Group the page was listed in.
    pub group: GroupId,
}

/// Immutable navigation tree.
#[derive(Debug)]
pub struct NavigationTree {
    groups: Vec<DocumentationGroup>,
    pages: HashMap<String, NavigationPage>,
    by_index: BTreeMap<usize, String>,
    resolved: OnceLock<HashMap<String, PageMeta>>,
}

impl NavigationTree {
    /// Build the tree from TOC entries.
    ///
    /// # Arguments
    ///
    /// * `toc` - TOC entries in authored order
    /// * `files` - All classified files keyed by relative path
    /// * `folders` - Files below each folder, sorted by relative path
    /// * `docset_path` - File that configuration errors are reported against
    /// * `collector` - Receives configuration errors
    #[must_use]
    pub fn build(
        toc: &[TocItem],
        files: &BTreeMap<String, DocumentationFile>,
        folders: &BTreeMap<String, Vec<String>>,
        docset_path: &str,
        collector: &DiagnosticsCollector,
    ) -> Self {
        let mut builder = Builder {
            files,
            folders,
            docset_path,
            collector,
            groups: Vec::new(),
            pages: HashMap::new(),
            by_index: BTreeMap::new(),
        };
        let mut counter = 0;
        builder.build_group(toc, None, 0, None, &mut counter);

        for file in files.values().filter(|f| f.is_markdown()) {
            if !builder.pages.contains_key(file.relative_path()) {
                collector.emit_error(
                    docset_path,
                    format!(
                        "{} is unreachable in the TOC because one of its parents matches exclusion glob",
                        file.relative_path()
                    ),
                );
            }
        }

        tracing::debug!(
            groups = builder.groups.len(),
            pages = builder.pages.len(),
            "Built navigation tree"
        );

        Self {
            groups: builder.groups,
            pages: builder.pages,
            by_index: builder.by_index,
            resolved: OnceLock::new(),
        }
    }

    /// Top-level group.
    #[must_use]
    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    /// Look up a group.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different tree.
    #[must_use]
    pub fn group(&self, id: GroupId) -> &DocumentationGroup {
        &self.groups[id.0]
    }

    /// Navigation position of a page; `None` if unreachable.
    #[must_use]
    pub fn page(&self, path: &str) -> Option<&NavigationPage> {
        self.pages.get(path)
    }

    /// Reachable pages ordered by navigation index.
    pub fn pages_in_order(&self) -> impl Iterator<Item = (usize, &str)> {
        self.by_index.iter().map(|(i, p)| (*i, p.as_str()))
    }

    /// Nearest preceding page that is not hidden.
    #[must_use]
    pub fn previous(&self, path: &str) -> Option<&str> {
        let index = self.pages.get(path)?.navigation_index;
        self.by_index
            .range(..index)
            .rev()
            .map(|(_, p)| p.as_str())
            .find(|p| !self.is_hidden(p))
    }

    /// Nearest following page that is not hidden.
    #[must_use]
    pub fn next(&self, path: &str) -> Option<&str> {
        let index = self.pages.get(path)?.navigation_index;
        self.by_index
            .range(index + 1..)
            .map(|(_, p)| p.as_str())
            .find(|p| !self.is_hidden(p))
    }

    fn is_hidden(&self, path: &str) -> bool {
        self.pages.get(path).is_some_and(|p| p.hidden)
    }

    /// Whether a group, or any group below it, contains a page.
    #[must_use]
    pub fn holds(&self, id: GroupId, path: &str) -> bool {
        let group = self.group(id);
        group.index.as_deref() == Some(path)
            || group.own_files.contains(path)
            || group.groups.iter().any(|g| self.holds(*g, path))
    }

    /// Parse the title and front matter of every page, once.
    ///
    /// Groups and their pages are loaded in parallel. Later calls return the
    /// first result without invoking `load`.
    pub fn resolve<F>(&self, load: F) -> &HashMap<String, PageMeta>
    where
        F: Fn(&str) -> Option<PageMeta> + Sync,
    {
        self.resolved.get_or_init(|| {
            let pages: HashMap<String, PageMeta> =
                self.resolve_group(self.root(), &load).into_iter().collect();
            tracing::info!(pages = pages.len(), "Resolved navigation tree");
            pages
        })
    }

    /// Page metadata, if [`resolve`](Self::resolve) has run.
    #[must_use]
    pub fn resolved(&self) -> Option<&HashMap<String, PageMeta>> {
        self.resolved.get()
    }

    fn resolve_group<F>(&self, id: GroupId, load: &F) -> Vec<(String, PageMeta)>
    where
        F: Fn(&str) -> Option<PageMeta> + Sync,
    {
        let group = self.group(id);
        let files: Vec<&String> = group.index.iter().chain(&group.files).collect();
        let (mut pages, nested) = rayon::join(
            || {
                files
                    .par_iter()
                    .filter_map(|path| load(path).map(|meta| ((*path).clone(), meta)))
                    .collect::<Vec<_>>()
            },
            || {
                group
                    .groups
                    .par_iter()
                    .flat_map_iter(|g| self.resolve_group(*g, load))
                    .collect::<Vec<_>>()
            },
        );
        pages.extend(nested);
        pages
    }
}

struct Builder<'a> {
    files: &'a BTreeMap<String, DocumentationFile>,
    folders: &'a BTreeMap<String, Vec<String>>,
    docset_path: &'a str,
    collector: &'a DiagnosticsCollector,
    groups: Vec<DocumentationGroup>,
    pages: HashMap<String, NavigationPage>,
    by_index: BTreeMap<usize, String>,
}

impl Builder<'_> {
    fn build_group(
        &mut self,
        toc: &[TocItem],
        parent: Option<GroupId>,
        depth: usize,
        configured_index: Option<String>,
        counter: &mut usize,
    ) -> GroupId {
        let lookup = self.files;
        let id = GroupId(self.groups.len());
        self.groups.push(DocumentationGroup {
            parent,
            depth,
            ..DocumentationGroup::default()
        });

        let mut index = configured_index;
        let mut files: Vec<String> = Vec::new();
        let mut groups = Vec::new();
        let mut items = Vec::new();

        for (order, entry) in toc.iter().enumerate() {
            match entry {
                TocItem::File {
                    path,
                    hidden,
                    children,
                } => {
                    let Some(file) = lookup.get(path) else {
                        self.error(format!(
                            "The following file could not be located: {path} it may be excluded from the build in docset.yml"
                        ));
                        continue;
                    };
                    if let DocumentationFile::Excluded(_) = file
                        && has_markdown_extension(path)
                    {
                        self.error(format!(
                            "{path} matches exclusion glob from docset.yml yet appears in TOC"
                        ));
                        continue;
                    }
                    if !file.is_markdown() {
                        continue;
                    }

                    self.assign(path, *hidden, id, counter);

                    if !children.is_empty() {
                        if *hidden {
                            self.error(format!(
                                "The following file is hidden but has children: {path}"
                            ));
                        }
                        let group =
                            self.build_group(children, Some(id), depth + 1, Some(path.clone()), counter);
                        groups.push(group);
                        items.push(NavigationItem::Group {
                            order,
                            depth,
                            group,
                        });
                        continue;
                    }

                    files.push(path.clone());
                    if path.ends_with("index.md") && index.is_none() {
                        index = Some(path.clone());
                    }
                    if index.as_ref() != Some(path) && !*hidden {
                        items.push(NavigationItem::File {
                            order,
                            depth,
                            file: path.clone(),
                        });
                    }
                }
                TocItem::Folder { path, children } => {
                    let expanded;
                    let children = if children.is_empty() {
                        expanded = self.expand_folder(path);
                        &expanded
                    } else {
                        children
                    };
                    let group = self.build_group(children, Some(id), depth + 1, None, counter);
                    groups.push(group);
                    items.push(NavigationItem::Group {
                        order,
                        depth,
                        group,
                    });
                }
            }
        }

        let index = index.or_else(|| files.first().cloned());
        if let Some(index) = &index {
            files.retain(|f| f != index);
        }

        let group = &mut self.groups[id.0];
        group.own_files = files.iter().cloned().collect();
        group.index = index;
        group.files = files;
        group.groups = groups;
        group.navigation_items = items;
        id
    }

    fn assign(&mut self, path: &str, hidden: bool, group: GroupId, counter: &mut usize) {
        let navigation_index = *counter;
        *counter += 1;
        let page = NavigationPage {
            navigation_index,
            hidden,
            group,
        };
        if let Some(previous) = self.pages.insert(path.to_owned(), page) {
            self.by_index.remove(&previous.navigation_index);
        }
        self.by_index.insert(navigation_index, path.to_owned());
    }

    /// TOC entries for a folder listed without children.
    ///
    /// Markdown files directly inside the folder become `File` entries and each
    /// subdirectory holding markdown becomes a `Folder` entry, in relative path
    /// order, so nested folders build nested groups.
    fn expand_folder(&self, folder: &str) -> Vec<TocItem> {
        let Some(paths) = self.folders.get(folder) else {
            return Vec::new();
        };
        let prefix = format!("{folder}/");
        let mut subfolders = HashSet::new();
        let mut entries = Vec::new();

        for path in paths {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            if !self.files.get(path).is_some_and(DocumentationFile::is_markdown) {
                continue;
            }
            match rest.split_once('/') {
                None => entries.push(TocItem::File {
                    path: path.clone(),
                    hidden: false,
                    children: Vec::new(),
                }),
                Some((dir, _)) => {
                    if subfolders.insert(dir) {
                        entries.push(TocItem::Folder {
                            path: format!("{prefix}{dir}"),
                            children: Vec::new(),
                        });
                    }
                }
            }
        }
        entries
    }

    fn error(&self, message: String) {
        self.collector.emit_error(self.docset_path, message);
    }
}

#[allow(clippy::case_sensitive_file_extension_comparisons)]
fn has_markdown_extension(path: &str) -> bool {
    path.ends_with(".md")
}
