//! Reference strings: cross-file pointers embedded in descriptors.
//!
//! Three textual forms are recognised:
//!
//! | form | example | result |
//! |------|---------|--------|
//! | package URI | `package://foo_pkg/meshes/wheel.dae` | resolved |
//! | find substitution | `$(find foo_pkg)/urdf/robot.xacro` | resolved |
//! | plugin library | `libgazebo_ros_camera.so` | skipped |
//!
//! Anything else is an error. The relative part may start with `/`
//! (`package://foo_pkg//x.dae`, `$(find foo_pkg)/x.urdf`) or not
//! (`$(find foo_pkg)x.urdf`); both join to the same file.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use simstage_types::ResolvedReference;
use thiserror::Error;

use crate::locator::PackageLocator;

const PACKAGE_PREFIX: &str = "package://";
const FIND_PREFIX: &str = "$(find";
const PLUGIN_SUFFIX: &str = ".so";

static PACKAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^package://([^/\s]+)/(.+\..+)$").expect("package reference pattern is valid")
});

static FIND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\(find\s+([^\s)]+)\)(.+\..+)$").expect("find reference pattern is valid")
});

/// Which known prefix a reference carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    PackageUri,
    FindSubstitution,
}

impl fmt::Display for ReferenceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceForm::PackageUri => f.write_str("package://"),
            ReferenceForm::FindSubstitution => f.write_str("$(find ...)"),
        }
    }
}

/// A well-formed reference that could not be turned into an existing file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("could not find package '{package}' (referenced by '{reference}')")]
    PackageNotFound { package: String, reference: String },

    #[error("could not resolve file {} in '{reference}'", path.display())]
    FileNotFound { path: PathBuf, reference: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("cannot match resource path '{reference}' as a {form} reference")]
    Syntax {
        reference: String,
        form: ReferenceForm,
    },

    #[error("cannot parse reference '{reference}'")]
    Unrecognized { reference: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// The syntactic reading of a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    /// Points into a package.
    Package {
        form: ReferenceForm,
        package: &'a str,
        /// Path inside the package, leading `/` already stripped.
        relative: &'a str,
    },
    /// A bare plugin library name; nothing to resolve.
    Plugin(&'a str),
}

impl<'a> Reference<'a> {
    /// Classify a raw attribute value without touching the filesystem.
    pub fn classify(raw: &'a str) -> Result<Self, ReferenceError> {
        let raw = raw.trim();

        let form = if raw.starts_with(PACKAGE_PREFIX) {
            ReferenceForm::PackageUri
        } else if raw.starts_with(FIND_PREFIX) {
            ReferenceForm::FindSubstitution
        } else if raw.ends_with(PLUGIN_SUFFIX) {
            return Ok(Reference::Plugin(raw));
        } else {
            return Err(ReferenceError::Unrecognized {
                reference: raw.to_string(),
            });
        };

        let pattern = match form {
            ReferenceForm::PackageUri => &PACKAGE_PATTERN,
            ReferenceForm::FindSubstitution => &FIND_PATTERN,
        };

        let captures = pattern.captures(raw).ok_or_else(|| ReferenceError::Syntax {
            reference: raw.to_string(),
            form,
        })?;

        match (captures.get(1), captures.get(2)) {
            (Some(package), Some(relative)) => Ok(Reference::Package {
                form,
                package: package.as_str(),
                relative: relative.as_str().trim_start_matches('/'),
            }),
            _ => Err(ReferenceError::Syntax {
                reference: raw.to_string(),
                form,
            }),
        }
    }
}

/// Join `relative` onto the root of `package` and require a regular file.
///
/// The returned path is canonical, so different spellings of the same
/// file (`a/../b.urdf`, symlinked package roots) compare equal.
pub fn resolve_in_package(
    locator: &dyn PackageLocator,
    package: &str,
    relative: &str,
    reference: &str,
) -> Result<PathBuf, ResolutionError> {
    let root = locator
        .locate(package)
        .map_err(|_| ResolutionError::PackageNotFound {
            package: package.to_string(),
            reference: reference.to_string(),
        })?;

    let path = root.join(relative.trim_start_matches('/'));
    let not_found = || ResolutionError::FileNotFound {
        path: path.clone(),
        reference: reference.to_string(),
    };

    if !path.is_file() {
        return Err(not_found());
    }
    path.canonicalize().map_err(|_| not_found())
}

/// Resolves reference strings against a package locator.
#[derive(Clone, Copy)]
pub struct ReferenceParser<'a> {
    locator: &'a dyn PackageLocator,
}

impl<'a> ReferenceParser<'a> {
    pub fn new(locator: &'a dyn PackageLocator) -> Self {
        Self { locator }
    }

    /// Resolve one reference.
    ///
    /// `Ok(None)` means the reference is a plugin library and was skipped.
    pub fn resolve(&self, raw: &str) -> Result<Option<ResolvedReference>, ReferenceError> {
        match Reference::classify(raw)? {
            Reference::Plugin(name) => {
                tracing::trace!(plugin = name, "skipping plugin reference");
                Ok(None)
            }
            Reference::Package {
                package, relative, ..
            } => {
                let path = resolve_in_package(self.locator, package, relative, raw.trim())?;
                Ok(Some(ResolvedReference::new(package, path)))
            }
        }
    }
}
