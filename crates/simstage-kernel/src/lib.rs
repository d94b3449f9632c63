//! simstage-kernel: the core of simstage.
//!
//! This crate provides:
//!
//! - **Reference parsing**: `package://` and `$(find ...)` references to package files
//! - **Descriptors**: parsed world/sdf/xacro/urdf/dae markup trees
//! - **Closure resolution**: every package and file a descriptor transitively needs
//! - **Workspace scanning**: launch roots, the model index and the worlds in use
//! - **Validation**: the ordered, fail-fast check pipeline
//! - **Staging**: copying the validated asset set into an output tree
//!
//! Everything is synchronous. Only [`stage()`] writes to the filesystem.

pub mod closure;
pub mod config;
pub mod descriptor;
pub mod locator;
pub mod paths;
pub mod reference;
pub mod stage;
pub mod validator;
pub mod workspace;

pub use closure::{ClosureResolver, Resolution, ResolveError};
pub use config::{ConfigError, ExtensionSet, ModelCollisionPolicy, StageConfig, StageLayout};
pub use descriptor::{Descriptor, DescriptorError, Element};
pub use locator::{
    LocatorError, MapLocator, PACKAGE_PATH_VAR, PackageLocator, PackagePathLocator,
};
pub use reference::{Reference, ReferenceError, ReferenceForm, ReferenceParser, ResolutionError};
pub use stage::{AssetStager, FsStager, StageError, StageReport, stage};
pub use validator::{Check, ValidationReport, Validator};
pub use workspace::{EnvironmentError, ScanError, Workspace, WorkspaceClosure};

pub use simstage_types::{Closure, ResolvedReference, Severity, ValidationOutcome};
