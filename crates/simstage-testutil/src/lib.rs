//! Test utilities for simstage.
//!
//! [`Fixture`] builds a throwaway catkin workspace on disk: a `src` folder
//! holding packages, descriptors and launch files, plus an optional Gazebo
//! resource root. The [`templates`] module renders the markup.
//!
//! Fixtures panic on I/O failure; they are only meant for tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod templates;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use simstage_kernel::config::StageConfig;
use simstage_kernel::locator::MapLocator;
use simstage_kernel::workspace::Workspace;
use tempfile::TempDir;

/// Name of the anchor package in the default configuration.
pub const ANCHOR: &str = "virtual_maize_field";

/// A temporary workspace.
pub struct Fixture {
    dir: TempDir,
    src: PathBuf,
    locator: MapLocator,
    resource_path: Option<String>,
    config: StageConfig,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// An empty workspace with no packages.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let base = dir.path().canonicalize().expect("canonicalize temp dir");
        let src = base.join("src");
        fs::create_dir_all(&src).expect("create src");
        Self {
            dir,
            src,
            locator: MapLocator::new(),
            resource_path: None,
            config: StageConfig::default(),
        }
    }

    /// A workspace that passes every standard check.
    ///
    /// - `virtual_maize_field` with `worlds/generated.world` including
    ///   `model://maize_plant`, whose mesh keeps its texture in
    ///   `materials/textures`
    /// - `robot_pkg` with `launch/sim.launch` naming `urdf/robot.xacro`,
    ///   which includes `urdf/sensors.xacro` and a mesh
    /// - a Gazebo resource root with material scripts
    pub fn competition() -> Self {
        let mut fx = Self::new();
        fx.package(ANCHOR);
        fx.write(
            "virtual_maize_field/worlds/generated.world",
            &templates::world(&["maize_plant"]),
        );
        fx.write(
            "virtual_maize_field/models/maize_plant/model.sdf",
            &templates::model_sdf("maize_plant", Some("Gazebo/Grass")),
        );
        fx.write(
            "virtual_maize_field/models/maize_plant/meshes/plant.dae",
            &templates::collada(&["../materials/textures/leaf.png"]),
        );
        fx.write(
            "virtual_maize_field/models/maize_plant/materials/textures/leaf.png",
            "png",
        );

        fx.package("robot_pkg");
        fx.write(
            "robot_pkg/launch/sim.launch",
            &templates::launch(&["$(find robot_pkg)/urdf/robot.xacro"]),
        );
        fx.write(
            "robot_pkg/urdf/robot.xacro",
            &templates::robot(
                &[
                    "$(find robot_pkg)/urdf/sensors.xacro",
                    "package://robot_pkg/meshes/base.dae",
                ],
                &[],
            ),
        );
        fx.write(
            "robot_pkg/urdf/sensors.xacro",
            &templates::robot(&[], &["libgazebo_ros_camera.so"]),
        );
        fx.write(
            "robot_pkg/meshes/base.dae",
            &templates::collada(&[]),
        );

        fx.gazebo_resources();
        fx
    }

    /// The canonical `src` folder.
    pub fn src(&self) -> &Path {
        &self.src
    }

    /// The canonical directory holding `src`.
    pub fn base(&self) -> &Path {
        self.src.parent().unwrap_or_else(|| self.dir.path())
    }

    /// `src/<rel>`.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.src.join(rel)
    }

    /// Create `src/<name>/package.xml` and register the package.
    pub fn package(&mut self, name: &str) -> PathBuf {
        self.package_at(name, name)
    }

    /// Create a package named `name` in `src/<rel_dir>` and register it.
    pub fn package_at(&mut self, rel_dir: &str, name: &str) -> PathBuf {
        let root = self.path(rel_dir);
        self.write(&format!("{rel_dir}/package.xml"), &templates::package_xml(name));
        self.locator.insert(name, &root);
        root
    }

    /// Write `contents` to `src/<rel>`, creating parent folders.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        write_file(&self.path(rel), contents)
    }

    /// Create a Gazebo resource root with material scripts and use it as
    /// the resource search path. Returns the root.
    pub fn gazebo_resources(&mut self) -> PathBuf {
        let root = self.base().join("gazebo-11");
        write_file(
            &root.join("media/materials/scripts/gazebo.material"),
            "material Gazebo/Grass {}\n",
        );
        self.resource_path = Some(root.display().to_string());
        root
    }

    /// Override the resource search path.
    pub fn set_resource_path(&mut self, value: Option<String>) {
        self.resource_path = value;
    }

    pub fn config_mut(&mut self) -> &mut StageConfig {
        &mut self.config
    }

    pub fn locator(&self) -> MapLocator {
        self.locator.clone()
    }

    /// A workspace over `src` that never reads the process environment.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.src, Arc::new(self.locator()))
            .with_config(self.config.clone())
            .with_resource_search_path(self.resource_path.clone())
    }

    /// A fresh, not yet existing output folder next to `src`.
    pub fn output(&self) -> PathBuf {
        self.base().join("simulation_files")
    }
}

fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write fixture file");
    path.to_path_buf()
}
