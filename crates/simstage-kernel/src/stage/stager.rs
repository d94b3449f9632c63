//! Filesystem operations used while staging.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use simstage_glob::{FileWalker, WalkEntry};

use crate::config::ExtensionSet;

/// A destination file is refreshed when its source is newer by more than
/// this.
pub const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Counts from one [`AssetStager::mirror`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub copied: usize,
    pub skipped: usize,
}

/// Counts from one [`AssetStager::prune`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// The side-effecting half of staging.
///
/// Paths are absolute. Implementations decide how files actually move;
/// [`FsStager`] copies them on the local filesystem.
pub trait AssetStager {
    /// Remove every directory directly below `root`. Files are kept.
    /// Returns the number of directories removed.
    fn clear(&self, root: &Path) -> io::Result<usize>;

    /// Copy the tree below `src` into `dst`, creating `dst` if needed.
    ///
    /// Existing destination files are only overwritten when the source
    /// is newer by more than [`MTIME_TOLERANCE`].
    fn mirror(&self, src: &Path, dst: &Path) -> io::Result<MirrorStats>;

    /// Delete every file below `root` whose extension is not in `keep`,
    /// then every directory left empty, `root` included.
    fn prune(&self, root: &Path, keep: &ExtensionSet) -> io::Result<PruneStats>;
}

/// Stages onto the local filesystem, preserving modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStager;

impl FsStager {
    pub fn new() -> Self {
        Self
    }
}

impl AssetStager for FsStager {
    fn clear(&self, root: &Path) -> io::Result<usize> {
        if !root.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in entries(FileWalker::new(root).follow_links(false).max_depth(Some(1)))? {
            if entry.is_dir() {
                fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn mirror(&self, src: &Path, dst: &Path) -> io::Result<MirrorStats> {
        let mut stats = MirrorStats::default();
        let found = entries(FileWalker::new(src))?;
        fs::create_dir_all(dst)?;

        for entry in found {
            let Ok(relative) = entry.path().strip_prefix(src) else {
                continue;
            };
            let to = dst.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&to)?;
                continue;
            }
            if !entry.is_file() {
                continue;
            }

            let meta = fs::metadata(entry.path())?;
            if needs_copy(&meta, &to) {
                copy_preserving_mtime(entry.path(), &to, &meta)?;
                stats.copied += 1;
            } else {
                stats.skipped += 1;
            }
        }

        tracing::debug!(
            src = %src.display(),
            dst = %dst.display(),
            copied = stats.copied,
            skipped = stats.skipped,
            "mirrored"
        );
        Ok(stats)
    }

    fn prune(&self, root: &Path, keep: &ExtensionSet) -> io::Result<PruneStats> {
        let mut stats = PruneStats::default();
        if !root.is_dir() {
            return Ok(stats);
        }

        let mut dirs = Vec::new();
        for entry in entries(FileWalker::new(root).follow_links(false))? {
            if entry.is_dir() {
                dirs.push(entry.into_path());
            } else if !keep.contains(entry.path()) {
                fs::remove_file(entry.path())?;
                stats.files_removed += 1;
            }
        }

        // Walk order lists parents first, so reversed it empties children
        // before their parents.
        dirs.reverse();
        dirs.push(root.to_path_buf());
        for dir in &dirs {
            if fs::read_dir(dir)?.next().is_none() {
                fs::remove_dir(dir)?;
                stats.dirs_removed += 1;
            }
        }
        Ok(stats)
    }
}

fn entries(walker: FileWalker) -> io::Result<Vec<WalkEntry>> {
    walker.entries().map_err(io::Error::other)
}

fn needs_copy(source: &fs::Metadata, destination: &Path) -> bool {
    let Ok(existing) = fs::metadata(destination) else {
        return true;
    };
    match (source.modified(), existing.modified()) {
        (Ok(src), Ok(dst)) => src
            .duration_since(dst)
            .is_ok_and(|newer_by| newer_by > MTIME_TOLERANCE),
        _ => true,
    }
}

fn copy_preserving_mtime(from: &Path, to: &Path, meta: &fs::Metadata) -> io::Result<()> {
    fs::copy(from, to)?;
    let modified: SystemTime = meta.modified()?;
    File::options().write(true).open(to)?.set_modified(modified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn mirror_copies_nested_tree_and_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("meshes/wheel.dae"), "<COLLADA/>");
        write(&src.join("model.sdf"), "<sdf/>");
        let then = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&src.join("model.sdf"), then);

        let stats = FsStager.mirror(&src, &dst).unwrap();

        assert_eq!(stats, MirrorStats { copied: 2, skipped: 0 });
        assert_eq!(fs::read_to_string(dst.join("meshes/wheel.dae")).unwrap(), "<COLLADA/>");
        let copied = fs::metadata(dst.join("model.sdf")).unwrap().modified().unwrap();
        assert_eq!(copied, then);
    }

    #[test]
    fn mirror_skips_files_within_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("a.sdf"), "new");
        write(&dst.join("a.sdf"), "old");
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&dst.join("a.sdf"), base);

        set_mtime(&src.join("a.sdf"), base + Duration::from_millis(500));
        let stats = FsStager.mirror(&src, &dst).unwrap();
        assert_eq!(stats, MirrorStats { copied: 0, skipped: 1 });
        assert_eq!(fs::read_to_string(dst.join("a.sdf")).unwrap(), "old");

        set_mtime(&src.join("a.sdf"), base + Duration::from_secs(5));
        let stats = FsStager.mirror(&src, &dst).unwrap();
        assert_eq!(stats, MirrorStats { copied: 1, skipped: 0 });
        assert_eq!(fs::read_to_string(dst.join("a.sdf")).unwrap(), "new");
    }

    #[test]
    fn prune_removes_unlisted_files_and_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gzweb");
        write(&root.join("pkg/meshes/base.DAE"), "");
        write(&root.join("pkg/CMakeLists.txt"), "");
        write(&root.join("pkg/scripts/run.py"), "");

        let keep = ExtensionSet::new([".dae"]);
        let stats = FsStager.prune(&root, &keep).unwrap();

        assert_eq!(stats.files_removed, 2);
        assert_eq!(stats.dirs_removed, 1);
        assert!(root.join("pkg/meshes/base.DAE").is_file());
        assert!(!root.join("pkg/scripts").exists());
    }

    #[test]
    fn prune_removes_root_when_nothing_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("robot_packages");
        write(&root.join("pkg/src/main.cpp"), "");

        let stats = FsStager.prune(&root, &ExtensionSet::new([".dae"])).unwrap();

        assert_eq!(stats.files_removed, 1);
        assert_eq!(stats.dirs_removed, 3);
        assert!(!root.exists());
    }

    #[test]
    fn clear_removes_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("gzweb/a.dae"), "");
        write(&dir.path().join("worlds/b.world"), "");
        write(&dir.path().join(".gitkeep"), "");

        assert_eq!(FsStager.clear(dir.path()).unwrap(), 2);
        assert!(dir.path().join(".gitkeep").is_file());
        assert!(!dir.path().join("gzweb").exists());
        assert_eq!(FsStager.clear(&dir.path().join("missing")).unwrap(), 0);
    }

    #[test]
    fn mirror_of_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsStager
            .mirror(&dir.path().join("missing"), &dir.path().join("dst"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[cfg(unix)]
    #[test]
    fn mirror_follows_symlinks_but_not_loops() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let shared = dir.path().join("shared");
        write(&src.join("a/mesh.dae"), "<COLLADA/>");
        write(&shared.join("wheel.dae"), "<COLLADA/>");
        std::os::unix::fs::symlink(&src, src.join("a/back")).unwrap();
        std::os::unix::fs::symlink(&shared, src.join("shared")).unwrap();

        let stats = FsStager.mirror(&src, &dst).unwrap();

        assert_eq!(stats, MirrorStats { copied: 2, skipped: 0 });
        assert!(dst.join("a/mesh.dae").is_file());
        assert!(dst.join("shared/wheel.dae").is_file());
        assert!(!dst.join("a/back").exists());
    }

    #[cfg(unix)]
    #[test]
    fn prune_removes_symlinks_without_following_them() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gzweb");
        let outside = dir.path().join("outside");
        write(&root.join("pkg/base.dae"), "");
        write(&outside.join("notes.txt"), "");
        std::os::unix::fs::symlink(&outside, root.join("pkg/linked")).unwrap();

        let stats = FsStager.prune(&root, &ExtensionSet::new([".dae"])).unwrap();

        assert_eq!(stats, PruneStats { files_removed: 1, dirs_removed: 0 });
        assert!(!root.join("pkg/linked").exists());
        assert!(outside.join("notes.txt").is_file());
    }
}
