//! Package name → filesystem root lookup.
//!
//! The core only sees the [`PackageLocator`] trait. Two implementations
//! ship here:
//!
//! - [`MapLocator`]: a fixed table, for tests and embedding
//! - [`PackagePathLocator`]: crawls `ROS_PACKAGE_PATH`-style roots for
//!   `package.xml` manifests

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use simstage_glob::{FileWalker, WalkEntry};
use thiserror::Error;

use crate::descriptor::Descriptor;

/// Environment variable holding the package search path.
pub const PACKAGE_PATH_VAR: &str = "ROS_PACKAGE_PATH";

const MANIFEST: &str = "package.xml";
const IGNORE_MARKER: &str = "CATKIN_IGNORE";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("package '{package}' not found")]
    NotFound { package: String },
}

/// Maps a package name to the absolute path of its root directory.
pub trait PackageLocator: Send + Sync {
    fn locate(&self, package: &str) -> Result<PathBuf, LocatorError>;
}

/// A locator backed by an explicit table.
#[derive(Debug, Clone, Default)]
pub struct MapLocator {
    packages: HashMap<String, PathBuf>,
}

impl MapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a package root.
    pub fn insert(&mut self, package: impl Into<String>, root: impl Into<PathBuf>) {
        self.packages.insert(package.into(), root.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, package: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.insert(package, root);
        self
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageLocator for MapLocator {
    fn locate(&self, package: &str) -> Result<PathBuf, LocatorError> {
        self.packages
            .get(package)
            .cloned()
            .ok_or_else(|| LocatorError::NotFound {
                package: package.to_string(),
            })
    }
}

/// A locator that indexes every package below a list of search roots.
///
/// A directory holding a `package.xml` is a package; its name comes from
/// the manifest's `<name>` element, falling back to the directory name.
/// Package directories are not searched further, hidden directories and
/// directories marked with `CATKIN_IGNORE` are skipped, and when a name
/// appears twice the root listed first wins.
#[derive(Debug, Clone, Default)]
pub struct PackagePathLocator {
    index: MapLocator,
}

impl PackagePathLocator {
    /// Crawl a colon-separated list of roots.
    pub fn from_search_path(search_path: &str) -> Self {
        Self::crawl(
            search_path
                .split(':')
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        )
    }

    /// Crawl the given roots in order.
    pub fn crawl(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut index = MapLocator::new();

        for root in roots {
            for dir in package_dirs(&root) {
                let name = manifest_name(&dir);
                if index.packages.contains_key(&name) {
                    tracing::debug!(package = %name, path = %dir.display(), "shadowed package ignored");
                } else {
                    index.insert(name, dir);
                }
            }
        }

        tracing::debug!(packages = index.len(), "package index built");
        Self { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl PackageLocator for PackagePathLocator {
    fn locate(&self, package: &str) -> Result<PathBuf, LocatorError> {
        self.index.locate(package)
    }
}

fn is_package(dir: &Path) -> bool {
    dir.join(MANIFEST).is_file()
}

fn is_ignored(dir: &Path) -> bool {
    dir.join(IGNORE_MARKER).exists()
}

/// Package directories below `root` in walk order. Hidden and ignored
/// directories are skipped, and nothing below a package is visited.
fn package_dirs(root: &Path) -> Vec<PathBuf> {
    if is_ignored(root) {
        return Vec::new();
    }
    if is_package(root) {
        return vec![root.to_path_buf()];
    }

    let walker = FileWalker::new(root)
        .skip_hidden(true)
        .prune(|path| is_ignored(path) || path.parent().is_some_and(is_package));

    match walker.entries() {
        Ok(entries) => entries
            .into_iter()
            .filter(|entry| entry.is_dir() && is_package(entry.path()))
            .map(WalkEntry::into_path)
            .collect(),
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "cannot crawl package root");
            Vec::new()
        }
    }
}

fn manifest_name(package_dir: &Path) -> String {
    let fallback = || {
        package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    match Descriptor::open(&package_dir.join(MANIFEST)) {
        Ok(manifest) => manifest
            .root()
            .child("name")
            .and_then(|e| e.text())
            .map(str::to_string)
            .unwrap_or_else(fallback),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable package manifest, using directory name");
            fallback()
        }
    }
}
