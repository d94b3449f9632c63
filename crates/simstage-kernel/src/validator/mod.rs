//! Workspace validation.
//!
//! A [`Validator`] runs an ordered list of [`Check`]s against a
//! [`Workspace`](crate::workspace::Workspace) and stops at the first
//! error. Checks only read the filesystem; severity is decided here, never
//! in the scanner.

mod checks;
mod pipeline;

pub use checks::{
    dependencies, find_gazebo_resources, gazebo_plugins, mesh_files, standard_checks, world_file,
};
pub use pipeline::{Check, ReportEntry, ValidationReport, Validator};
