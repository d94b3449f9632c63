//! Copy the validated asset set into an output tree.
//!
//! Layout below the output folder:
//!
//! ```text
//! <anchor folder>/   one per configured anchor folder
//! gzweb/             web preview assets, pruned to the GZWeb extensions
//! robot_packages/    every required package, pruned to the Gazebo extensions
//! ```
//!
//! [`stage`] decides what goes where; an [`AssetStager`] does the copying.

mod stager;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::locator::LocatorError;
use crate::workspace::{EnvironmentError, ScanError, Workspace};

pub use stager::{AssetStager, FsStager, MTIME_TOLERANCE, MirrorStats, PruneStats};

pub const GZWEB_DIR: &str = "gzweb";
pub const ROBOT_PACKAGES_DIR: &str = "robot_packages";
/// Where the material scripts land below the GZWeb folder.
pub const MATERIAL_SCRIPTS_DIR: &str = "materials/scripts";
/// Packages with this folder are needed by the web preview.
pub const MESHES_DIR: &str = "meshes";

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("cannot find package '{package}': {source}")]
    Locate {
        package: String,
        #[source]
        source: LocatorError,
    },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One folder copied into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFolder {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub stats: MirrorStats,
}

/// What [`stage`] did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub output: PathBuf,
    /// Old directories removed from the output before copying.
    pub cleared: usize,
    pub folders: Vec<StagedFolder>,
    /// Anchor folders that did not exist and were left out.
    pub missing: Vec<PathBuf>,
    pub pruned: PruneStats,
}

impl StageReport {
    pub fn files_copied(&self) -> usize {
        self.folders.iter().map(|f| f.stats.copied).sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.folders.iter().map(|f| f.stats.skipped).sum()
    }

    fn record(&mut self, source: PathBuf, destination: PathBuf, stats: MirrorStats) {
        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            copied = stats.copied,
            "staged"
        );
        self.folders.push(StagedFolder {
            source,
            destination,
            stats,
        });
    }

    fn add_pruned(&mut self, stats: PruneStats) {
        self.pruned.files_removed += stats.files_removed;
        self.pruned.dirs_removed += stats.dirs_removed;
    }
}

/// Stage everything a validated workspace needs into `output`.
///
/// Only call this after validation passed.
pub fn stage(
    ws: &Workspace,
    output: &Path,
    stager: &dyn AssetStager,
) -> Result<StageReport, StageError> {
    let config = ws.config();
    let layout = &config.stage;
    let anchor = locate(ws, &config.anchor_package)?;
    let mut report = StageReport {
        output: output.to_path_buf(),
        ..StageReport::default()
    };

    report.cleared = stager
        .clear(output)
        .map_err(|source| io_error("clearing", output, source))?;

    for folder in &layout.anchor_folders {
        let source = anchor.join(folder);
        if !source.is_dir() {
            tracing::warn!(folder = %source.display(), "anchor folder missing, not staged");
            report.missing.push(source);
            continue;
        }
        let destination = output.join(folder);
        let stats = mirror(stager, &source, &destination)?;
        report.record(source, destination, stats);
    }

    let gzweb = output.join(GZWEB_DIR);
    for folder in &layout.gzweb_folders {
        let source = anchor.join(folder);
        if !source.is_dir() {
            tracing::warn!(folder = %source.display(), "gzweb folder missing, not staged");
            report.missing.push(source);
            continue;
        }
        let stats = mirror(stager, &source, &gzweb)?;
        report.record(source, gzweb.clone(), stats);
    }

    let materials = ws.material_resource_folder()?;
    let destination = gzweb.join(MATERIAL_SCRIPTS_DIR);
    let stats = mirror(stager, &materials, &destination)?;
    report.record(materials, destination, stats);

    let packages = ws.dependent_packages()?;
    let mut package_roots = Vec::with_capacity(packages.len());
    for package in &packages {
        package_roots.push(locate(ws, package)?);
    }

    for root in package_roots.iter().filter(|r| r.join(MESHES_DIR).is_dir()) {
        let destination = gzweb.join(dir_name(root));
        let stats = mirror(stager, root, &destination)?;
        report.record(root.clone(), destination, stats);
    }
    let pruned = stager
        .prune(&gzweb, &layout.gzweb_extensions)
        .map_err(|source| io_error("pruning", &gzweb, source))?;
    report.add_pruned(pruned);

    let robot_packages = output.join(ROBOT_PACKAGES_DIR);
    for root in &package_roots {
        let destination = robot_packages.join(dir_name(root));
        let stats = mirror(stager, root, &destination)?;
        report.record(root.clone(), destination, stats);
    }
    let pruned = stager
        .prune(&robot_packages, &layout.gazebo_extensions)
        .map_err(|source| io_error("pruning", &robot_packages, source))?;
    report.add_pruned(pruned);

    Ok(report)
}

fn locate(ws: &Workspace, package: &str) -> Result<PathBuf, StageError> {
    ws.locator()
        .locate(package)
        .map_err(|source| StageError::Locate {
            package: package.to_string(),
            source,
        })
}

fn mirror(stager: &dyn AssetStager, src: &Path, dst: &Path) -> Result<MirrorStats, StageError> {
    stager
        .mirror(src, dst)
        .map_err(|source| io_error("copying", src, source))
}

fn io_error(action: &'static str, path: &Path, source: io::Error) -> StageError {
    StageError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn dir_name(path: &Path) -> &Path {
    path.file_name().map(Path::new).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_destination_uses_directory_name() {
        assert_eq!(dir_name(Path::new("/ws/src/robot_pkg")), Path::new("robot_pkg"));
    }

    #[test]
    fn report_totals() {
        let mut report = StageReport::default();
        report.record(
            PathBuf::from("/a"),
            PathBuf::from("/out/a"),
            MirrorStats { copied: 3, skipped: 1 },
        );
        report.record(
            PathBuf::from("/b"),
            PathBuf::from("/out/b"),
            MirrorStats { copied: 2, skipped: 0 },
        );
        report.add_pruned(PruneStats {
            files_removed: 4,
            dirs_removed: 1,
        });

        assert_eq!(report.files_copied(), 5);
        assert_eq!(report.files_skipped(), 1);
        assert_eq!(report.pruned.files_removed, 4);
    }
}
