//! Transitive dependency closure of a single descriptor.
//!
//! The resolver walks the reference graph with an explicit worklist. A
//! descriptor is expanded at most once, keyed by its canonical path, so
//! diamonds and cycles (including a file that references itself)
//! terminate without redundant parsing.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use simstage_types::{Closure, ResolvedReference};
use thiserror::Error;

use crate::descriptor::{Descriptor, DescriptorError, is_descriptor};
use crate::locator::PackageLocator;
use crate::reference::{ReferenceError, ReferenceParser};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{}: {source}", descriptor.display())]
    Reference {
        /// Descriptor containing the offending reference.
        descriptor: PathBuf,
        #[source]
        source: ReferenceError,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl ResolveError {
    /// The underlying reference failure, if that is what this is.
    pub fn reference_error(&self) -> Option<&ReferenceError> {
        match self {
            ResolveError::Reference { source, .. } => Some(source),
            ResolveError::Descriptor(_) => None,
        }
    }
}

/// Everything reachable from one root descriptor.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Full transitive closure. The root itself is only included when
    /// something references it.
    pub closure: Closure,
    /// References found in the root descriptor itself.
    pub direct: Closure,
    /// Every descriptor that was expanded: the root first, then the rest
    /// in breadth-first discovery order.
    pub descriptors: Vec<Descriptor>,
}

impl Resolution {
    pub fn descriptor_paths(&self) -> impl Iterator<Item = &Path> {
        self.descriptors.iter().map(Descriptor::path)
    }
}

/// Computes [`Resolution`]s against a package locator.
#[derive(Clone, Copy)]
pub struct ClosureResolver<'a> {
    parser: ReferenceParser<'a>,
}

impl<'a> ClosureResolver<'a> {
    pub fn new(locator: &'a dyn PackageLocator) -> Self {
        Self {
            parser: ReferenceParser::new(locator),
        }
    }

    /// Open `path` and resolve its closure.
    pub fn resolve_path(&self, path: &Path) -> Result<Resolution, ResolveError> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.resolve(Descriptor::open(&path)?)
    }

    /// Resolve the closure of an already parsed descriptor.
    ///
    /// Any reference failure aborts the whole resolution.
    pub fn resolve(&self, root: Descriptor) -> Result<Resolution, ResolveError> {
        let root_key = root
            .path()
            .canonicalize()
            .unwrap_or_else(|_| root.path().to_path_buf());

        let mut visited = HashSet::from([root_key]);
        let mut closure = Closure::new();
        let mut direct = Closure::new();
        let mut descriptors = Vec::new();
        let mut frontier = VecDeque::from([root]);

        while let Some(descriptor) = frontier.pop_front() {
            let references = self.direct_references(&descriptor)?;
            if descriptors.is_empty() {
                direct.extend(references.iter().cloned());
            }

            for reference in references {
                let path = reference.path.clone();
                closure.insert(reference);

                if is_descriptor(&path) && visited.insert(path.clone()) {
                    tracing::debug!(
                        from = %descriptor.path().display(),
                        descriptor = %path.display(),
                        "expanding descriptor"
                    );
                    frontier.push_back(Descriptor::open(&path)?);
                }
            }

            descriptors.push(descriptor);
        }

        tracing::debug!(
            root = ?descriptors.first().map(Descriptor::path),
            packages = closure.packages().len(),
            resources = closure.resources().len(),
            "closure resolved"
        );

        Ok(Resolution {
            closure,
            direct,
            descriptors,
        })
    }

    /// Resolve every reference attribute of one descriptor, skipping
    /// plugin libraries.
    pub fn direct_references(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Vec<ResolvedReference>, ResolveError> {
        let mut resolved = Vec::new();
        for raw in descriptor.reference_attributes() {
            let reference = self
                .parser
                .resolve(raw)
                .map_err(|source| ResolveError::Reference {
                    descriptor: descriptor.path().to_path_buf(),
                    source,
                })?;
            if let Some(reference) = reference {
                tracing::trace!(reference = raw, path = %reference.path.display(), "resolved");
                resolved.push(reference);
            }
        }
        Ok(resolved)
    }
}
