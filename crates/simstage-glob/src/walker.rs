//! Deterministic recursive file walker.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use thiserror::Error;

/// Errors from walking a directory tree.
#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("walk root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] ignore::Error),
}

type PruneFn = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// One path below a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    path: PathBuf,
    is_dir: bool,
    is_file: bool,
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// A directory, or a followed symlink to one.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// A regular file, or a followed symlink to one.
    pub fn is_file(&self) -> bool {
        self.is_file
    }
}

/// Walks the tree below a root in a stable order.
///
/// Unlike a source-tree walker, nothing is filtered implicitly: hidden
/// files, `.gitignore`d paths and symlinked directories are all visited
/// unless asked otherwise. Unreadable subtrees and symlink loops are
/// logged and skipped.
#[derive(Clone)]
pub struct FileWalker {
    root: PathBuf,
    patterns: Vec<String>,
    follow_links: bool,
    skip_hidden: bool,
    max_depth: Option<usize>,
    prune: Option<PruneFn>,
}

impl fmt::Debug for FileWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWalker")
            .field("root", &self.root)
            .field("patterns", &self.patterns)
            .field("follow_links", &self.follow_links)
            .field("skip_hidden", &self.skip_hidden)
            .field("max_depth", &self.max_depth)
            .field("prune", &self.prune.is_some())
            .finish()
    }
}

impl FileWalker {
    /// Create a walker rooted at `root` that matches every file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: Vec::new(),
            follow_links: true,
            skip_hidden: false,
            max_depth: None,
            prune: None,
        }
    }

    /// Only yield files matching `pattern` (or any other included
    /// pattern). Patterns use gitignore glob syntax; one without a slash,
    /// like `*.launch`, matches the file name at any depth.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Whether to descend into symlinked directories. Defaults to `true`.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Skip entries whose name starts with a dot. Defaults to `false`.
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Limit the descent depth; `Some(1)` only lists the root's children.
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Drop every entry below the root for which `prune` returns `true`.
    /// A pruned directory is not entered.
    pub fn prune(mut self, prune: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.prune = Some(Arc::new(prune));
        self
    }

    /// The root this walker starts from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and return the matching files in walk order.
    pub fn walk(&self) -> Result<Vec<PathBuf>, WalkerError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(WalkEntry::is_file)
            .map(WalkEntry::into_path)
            .collect())
    }

    /// Walk the tree and return every directory plus every non-directory
    /// matching the include patterns, root excluded.
    ///
    /// Entries come depth-first with siblings sorted by file name, so a
    /// directory always precedes its contents.
    pub fn entries(&self) -> Result<Vec<WalkEntry>, WalkerError> {
        if !self.root.is_dir() {
            return Err(WalkerError::NotADirectory(self.root.clone()));
        }

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .hidden(self.skip_hidden)
            .overrides(self.overrides()?)
            .follow_links(self.follow_links)
            .max_depth(self.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b));
        if let Some(prune) = &self.prune {
            let prune = Arc::clone(prune);
            builder.filter_entry(move |entry| !prune(entry.path()));
        }

        let mut entries = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            entries.push(WalkEntry {
                is_dir: file_type.is_some_and(|t| t.is_dir()),
                is_file: file_type.is_some_and(|t| t.is_file()),
                path: entry.into_path(),
            });
        }

        Ok(entries)
    }

    /// Whitelist overrides for the include patterns. With at least one
    /// whitelist glob, non-matching files are skipped and directories are
    /// still entered.
    fn overrides(&self) -> Result<Override, WalkerError> {
        let mut builder = OverrideBuilder::new(&self.root);
        for pattern in &self.patterns {
            builder.add(pattern)?;
        }
        Ok(builder.build()?)
    }
}
