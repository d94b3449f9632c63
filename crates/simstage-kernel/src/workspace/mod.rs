//! Workspace scanning.
//!
//! A [`Workspace`] is a source tree (a catkin `src` folder) plus the
//! package locator and configuration needed to interpret it. From it the
//! scanner derives:
//!
//! - the launch roots: descriptors named by `*.launch` files
//! - the workspace closure: the union of every launch root's closure
//! - the model index and the world/model files actually in use
//!
//! Every method re-reads the tree; nothing is cached between calls.

mod launch;
mod models;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use simstage_glob::{FileWalker, WalkerError};
use simstage_types::Closure;
use thiserror::Error;

use crate::closure::{ClosureResolver, ResolveError};
use crate::config::StageConfig;
use crate::descriptor::{Descriptor, DescriptorError};
use crate::locator::{LocatorError, PackageLocator};
use crate::reference::{ResolutionError, resolve_in_package};

pub use launch::{LaunchReference, LaunchRoot, extract_launch_references};
pub use models::{MODEL_DESCRIPTOR, ModelIndex, parse_model_uri};

/// How far above the anchor package the `src` folder may be.
const MAX_SRC_DEPTH: usize = 10;
const SRC_DIR: &str = "src";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Walk(#[from] WalkerError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", launch.display())]
    LaunchRoot {
        launch: PathBuf,
        #[source]
        source: ResolutionError,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("could not find model '{model}' included by {}", world.display())]
    ModelNotFound { model: String, world: PathBuf },

    #[error("cannot parse model uri '{uri}' in {}", world.display())]
    ModelUri { uri: String, world: PathBuf },

    #[error("model name '{name}' is used by both {} and {}", first.display(), second.display())]
    ModelCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("cannot find package '{package}': {source}")]
    AnchorNotFound {
        package: String,
        #[source]
        source: LocatorError,
    },

    #[error("cannot find a 'src' folder above {}", .0.display())]
    WorkspaceRootNotFound(PathBuf),
}

impl ScanError {
    /// Missing files, missing packages, malformed or unrecognised
    /// references and unparseable descriptors in the closure: the failures
    /// that mean dependency information is incomplete rather than that the
    /// workspace is unusable.
    pub fn is_resolution_failure(&self) -> bool {
        match self {
            ScanError::LaunchRoot { .. } => true,
            ScanError::Resolve(ResolveError::Descriptor(DescriptorError::Markup { .. })) => true,
            ScanError::Resolve(e) => e.reference_error().is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("{var} is not set")]
    Unset { var: String },

    #[error("none of the entries in {var} contain {}", subpath.display())]
    NoValidRoot { var: String, subpath: PathBuf },
}

/// Where the material resource search path comes from.
#[derive(Debug, Clone)]
enum ResourceSearchPath {
    /// Read the configured environment variable on demand.
    Environment,
    /// Use this value (`None` behaves like an unset variable).
    Explicit(Option<String>),
}

/// Union of every launch root's closure.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceClosure {
    /// Launch-root packages plus every package they require.
    pub packages: BTreeSet<String>,
    pub closure: Closure,
    /// Every descriptor expanded, deduplicated by path, in discovery
    /// order.
    pub descriptors: Vec<Descriptor>,
}

/// A workspace source tree and the context needed to scan it.
#[derive(Clone)]
pub struct Workspace {
    root: PathBuf,
    locator: Arc<dyn PackageLocator>,
    config: StageConfig,
    resource_search_path: ResourceSearchPath,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("resource_search_path", &self.resource_search_path)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// A workspace rooted at `root` with default configuration.
    pub fn new(root: impl Into<PathBuf>, locator: Arc<dyn PackageLocator>) -> Self {
        Self {
            root: root.into(),
            locator,
            config: StageConfig::default(),
            resource_search_path: ResourceSearchPath::Environment,
        }
    }

    /// Find the workspace by locating the anchor package and walking up
    /// to the enclosing `src` folder.
    pub fn discover(
        locator: Arc<dyn PackageLocator>,
        config: StageConfig,
    ) -> Result<Self, ScanError> {
        let anchor = locator
            .locate(&config.anchor_package)
            .map_err(|source| ScanError::AnchorNotFound {
                package: config.anchor_package.clone(),
                source,
            })?;

        let root = find_src_ancestor(&anchor)
            .ok_or_else(|| ScanError::WorkspaceRootNotFound(anchor.clone()))?;

        tracing::debug!(root = %root.display(), "workspace discovered");
        Ok(Self::new(root, locator).with_config(config))
    }

    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `value` instead of the environment as the material resource
    /// search path.
    pub fn with_resource_search_path(mut self, value: Option<String>) -> Self {
        self.resource_search_path = ResourceSearchPath::Explicit(value);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locator(&self) -> &dyn PackageLocator {
        self.locator.as_ref()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Every `*.launch` file in the tree.
    pub fn launch_files(&self) -> Result<Vec<PathBuf>, ScanError> {
        Ok(FileWalker::new(&self.root).include("*.launch").walk()?)
    }

    /// Every root descriptor named by a launch file, resolved and checked
    /// for existence.
    pub fn launch_roots(&self) -> Result<Vec<LaunchRoot>, ScanError> {
        let mut roots = Vec::new();

        for launch_file in self.launch_files()? {
            let text = std::fs::read_to_string(&launch_file).map_err(|source| ScanError::Io {
                path: launch_file.clone(),
                source,
            })?;

            for reference in extract_launch_references(&text) {
                let path = resolve_in_package(
                    self.locator(),
                    &reference.package,
                    &reference.relative,
                    &reference.matched,
                )
                .map_err(|source| ScanError::LaunchRoot {
                    launch: launch_file.clone(),
                    source,
                })?;

                roots.push(LaunchRoot {
                    launch_file: launch_file.clone(),
                    package: reference.package,
                    path,
                });
            }
        }

        Ok(roots)
    }

    /// Resolve and merge the closure of every launch root.
    pub fn resolve_closure(&self) -> Result<WorkspaceClosure, ScanError> {
        let resolver = ClosureResolver::new(self.locator());
        let mut result = WorkspaceClosure::default();
        let mut expanded: HashSet<PathBuf> = HashSet::new();

        for root in self.launch_roots()? {
            result.packages.insert(root.package.clone());

            // Already expanded as part of an earlier root: its whole
            // closure is merged already.
            if expanded.contains(&root.path) {
                continue;
            }

            tracing::debug!(
                launch = %root.launch_file.display(),
                root = %root.path.display(),
                "resolving launch root"
            );
            let resolution = resolver.resolve_path(&root.path)?;

            result
                .packages
                .extend(resolution.closure.packages().iter().cloned());
            result.closure.merge(&resolution.closure);
            for descriptor in resolution.descriptors {
                if expanded.insert(descriptor.path().to_path_buf()) {
                    result.descriptors.push(descriptor);
                }
            }
        }

        Ok(result)
    }

    /// Every package transitively required by any launch file.
    pub fn dependent_packages(&self) -> Result<BTreeSet<String>, ScanError> {
        Ok(self.resolve_closure()?.packages)
    }

    /// Every descriptor transitively required by any launch file.
    pub fn used_descriptors(&self) -> Result<Vec<Descriptor>, ScanError> {
        Ok(self.resolve_closure()?.descriptors)
    }

    /// Index every `model.sdf` in the tree by model name.
    pub fn model_index(&self) -> Result<ModelIndex, ScanError> {
        let files = FileWalker::new(&self.root).include(MODEL_DESCRIPTOR).walk()?;
        ModelIndex::build(files, self.config.model_collisions)
    }

    /// World files plus the model files they include, in walk order, each
    /// listed once.
    ///
    /// World files that cannot be parsed are skipped; an include naming an
    /// unknown model is an error.
    pub fn used_model_files(&self) -> Result<Vec<PathBuf>, ScanError> {
        let index = self.model_index()?;
        let worlds = FileWalker::new(&self.root).include("*.world").walk()?;
        let mut used: Vec<PathBuf> = Vec::new();

        for world in worlds {
            let descriptor = match Descriptor::open(&world) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::warn!(world = %world.display(), error = %e, "skipping non parseable world file");
                    continue;
                }
            };

            push_unique(&mut used, world.clone());

            for uri in descriptor.find_children("include", "uri") {
                let text = uri.text().unwrap_or_default();
                let name = parse_model_uri(text).ok_or_else(|| ScanError::ModelUri {
                    uri: text.to_string(),
                    world: world.clone(),
                })?;
                let model = index.get(name).ok_or_else(|| ScanError::ModelNotFound {
                    model: name.to_string(),
                    world: world.clone(),
                })?;
                push_unique(&mut used, model.to_path_buf());
            }
        }

        Ok(used)
    }

    /// The first entry of the resource search path that contains the
    /// configured material subpath.
    pub fn material_resource_folder(&self) -> Result<PathBuf, EnvironmentError> {
        let var = &self.config.resource_path_var;
        let value = match &self.resource_search_path {
            ResourceSearchPath::Environment => std::env::var(var).ok(),
            ResourceSearchPath::Explicit(value) => value.clone(),
        };
        let value = value.ok_or_else(|| EnvironmentError::Unset { var: var.clone() })?;

        for entry in value.split(':').filter(|e| !e.trim().is_empty()) {
            let base = std::path::absolute(entry).unwrap_or_else(|_| PathBuf::from(entry));
            let candidate = base.join(&self.config.material_subpath);
            if candidate.is_dir() {
                return Ok(candidate);
            }
        }

        Err(EnvironmentError::NoValidRoot {
            var: var.clone(),
            subpath: self.config.material_subpath.clone(),
        })
    }
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

fn find_src_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_SRC_DEPTH)
        .find(|dir| dir.file_name().is_some_and(|name| name == SRC_DIR))
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MapLocator;

    #[test]
    fn src_ancestor_search() {
        assert_eq!(
            find_src_ancestor(Path::new("/home/u/ws/src/stack/virtual_maize_field")),
            Some(PathBuf::from("/home/u/ws/src"))
        );
        assert_eq!(
            find_src_ancestor(Path::new("/home/u/ws/src")),
            Some(PathBuf::from("/home/u/ws/src"))
        );
        assert_eq!(find_src_ancestor(Path::new("/opt/ros/share/vmf")), None);

        let deep = "/ws/src/1/2/3/4/5/6/7/8/9/pkg";
        assert_eq!(find_src_ancestor(Path::new(deep)), None);
    }

    #[test]
    fn discover_requires_the_anchor_package() {
        let err = Workspace::discover(Arc::new(MapLocator::new()), StageConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScanError::AnchorNotFound { .. }));
    }

    #[test]
    fn discover_walks_up_to_src() {
        let locator = MapLocator::new().with("virtual_maize_field", "/ws/src/virtual_maize_field");
        let ws = Workspace::discover(Arc::new(locator), StageConfig::default()).unwrap();
        assert_eq!(ws.root(), Path::new("/ws/src"));
    }

    #[test]
    fn resource_folder_from_explicit_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("gazebo-11");
        std::fs::create_dir_all(good.join("media/materials/scripts")).unwrap();
        let empty = dir.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();

        let ws = Workspace::new(dir.path(), Arc::new(MapLocator::new()));

        let search = format!("{}::{}", empty.display(), good.display());
        let found = ws
            .clone()
            .with_resource_search_path(Some(search))
            .material_resource_folder()
            .unwrap();
        assert_eq!(found, good.join("media/materials/scripts"));

        let err = ws
            .clone()
            .with_resource_search_path(Some(empty.display().to_string()))
            .material_resource_folder()
            .unwrap_err();
        assert!(matches!(err, EnvironmentError::NoValidRoot { .. }));

        let err = ws
            .with_resource_search_path(None)
            .material_resource_folder()
            .unwrap_err();
        assert_eq!(
            err,
            EnvironmentError::Unset {
                var: "GAZEBO_RESOURCE_PATH".to_string()
            }
        );
    }

    #[test]
    fn resolution_failures_are_classified() {
        let launch_root = ScanError::LaunchRoot {
            launch: PathBuf::from("a.launch"),
            source: ResolutionError::PackageNotFound {
                package: "x".to_string(),
                reference: "$(find x)/a.urdf".to_string(),
            },
        };
        assert!(launch_root.is_resolution_failure());

        let missing_model = ScanError::ModelNotFound {
            model: "m".to_string(),
            world: PathBuf::from("w.world"),
        };
        assert!(!missing_model.is_resolution_failure());

        let malformed = ScanError::Resolve(ResolveError::Descriptor(DescriptorError::Markup {
            path: PathBuf::from("robot.urdf"),
            message: "ill-formed document".to_string(),
        }));
        assert!(malformed.is_resolution_failure());

        let unreadable = ScanError::Resolve(ResolveError::Descriptor(DescriptorError::Io {
            path: PathBuf::from("robot.urdf"),
            source: std::io::Error::other("denied"),
        }));
        assert!(!unreadable.is_resolution_failure());
    }
}
