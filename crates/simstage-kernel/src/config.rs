//! Run configuration.
//!
//! Every fixed list and conventional path the scanner, validator and
//! stager rely on lives here, with defaults matching a Gazebo/ROS
//! workspace built around the `virtual_maize_field` package. A TOML file
//! can override any subset of keys:
//!
//! ```toml
//! anchor_package = "my_world_pkg"
//! canonical_world = "my_world_pkg/worlds/generated.world"
//! model_collisions = "error"
//!
//! [stage]
//! anchor_folders = ["worlds", "models"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::paths;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// What to do when two `model.sdf` files live in directories with the
/// same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelCollisionPolicy {
    /// Keep the file visited last in walk order and log a warning.
    #[default]
    LastWins,
    /// Fail the scan.
    Error,
}

/// A set of file extensions, stored lowercase with the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct ExtensionSet(Vec<String>);

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        Self(normalized)
    }

    /// Whether `path` has one of the extensions (case-insensitive).
    pub fn contains(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.0.iter().any(|e| *e == dotted)
    }
}

impl From<Vec<String>> for ExtensionSet {
    fn from(extensions: Vec<String>) -> Self {
        Self::new(extensions)
    }
}

/// File extensions of descriptors that are parsed and followed.
pub fn descriptor_extensions() -> ExtensionSet {
    ExtensionSet::new(["world", "sdf", "xacro", "urdf"])
}

/// Plugins that ship with the simulation container.
pub const DEFAULT_ALLOWED_PLUGINS: &[&str] = &[
    "libgazebo_ros_camera.so",
    "libgazebo_ros_multicamera.so",
    "libgazebo_ros_openni_kinect.so",
    "libgazebo_ros_control.so",
    "libgazebo_ros_gpu_laser.so",
    "libhector_gazebo_ros_imu.so",
    "libgazebo_ros_bumper.so",
    "librealsense_gazebo_plugin.so",
];

/// Extensions the web preview (GZWeb) needs.
pub const GZWEB_EXTENSIONS: &[&str] = &[
    ".stl", ".dae", ".sdf", ".config", ".material", ".png", ".jpg", ".tiff", ".jpeg", ".gazebo",
];

/// Extensions the full simulation needs.
pub const GAZEBO_EXTENSIONS: &[&str] = &[
    ".stl", ".dae", ".sdf", ".config", ".material", ".png", ".jpg", ".tiff", ".jpeg", ".gazebo",
    ".xml",
];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageConfig {
    /// Package whose location identifies the workspace and whose folders
    /// are staged.
    pub anchor_package: String,
    /// Environment variable listing material resource roots.
    pub resource_path_var: String,
    /// Subpath looked for below every resource root.
    pub material_subpath: PathBuf,
    /// Path suffix of the generated world file that must be in use.
    pub canonical_world: PathBuf,
    /// Texture references inside meshes must contain this path.
    pub texture_dir: String,
    /// Plugin filenames descriptors may load.
    pub allowed_plugins: Vec<String>,
    pub model_collisions: ModelCollisionPolicy,
    pub stage: StageLayout,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            anchor_package: "virtual_maize_field".to_string(),
            resource_path_var: "GAZEBO_RESOURCE_PATH".to_string(),
            material_subpath: PathBuf::from("media/materials/scripts"),
            canonical_world: PathBuf::from("virtual_maize_field/worlds/generated.world"),
            texture_dir: "../materials/textures".to_string(),
            allowed_plugins: DEFAULT_ALLOWED_PLUGINS.iter().map(|s| s.to_string()).collect(),
            model_collisions: ModelCollisionPolicy::default(),
            stage: StageLayout::default(),
        }
    }
}

/// Which folders and file types end up in the staged output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageLayout {
    /// Folders of the anchor package copied to the output root.
    pub anchor_folders: Vec<PathBuf>,
    /// Folders of the anchor package merged into `gzweb/`.
    pub gzweb_folders: Vec<PathBuf>,
    pub gzweb_extensions: ExtensionSet,
    pub gazebo_extensions: ExtensionSet,
}

impl Default for StageLayout {
    fn default() -> Self {
        Self {
            anchor_folders: ["Media", "map", "worlds", "launch", "rviz", "models"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            gzweb_folders: ["models", "Media/models"].into_iter().map(PathBuf::from).collect(),
            gzweb_extensions: ExtensionSet::new(GZWEB_EXTENSIONS),
            gazebo_extensions: ExtensionSet::new(GAZEBO_EXTENSIONS),
        }
    }
}

impl StageConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the XDG config file is
    /// used when present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let default_path = paths::config_file();
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "loading user config");
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn is_plugin_allowed(&self, filename: &str) -> bool {
        self.allowed_plugins.iter().any(|p| p == filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gazebo_layout() {
        let config = StageConfig::default();
        assert_eq!(config.resource_path_var, "GAZEBO_RESOURCE_PATH");
        assert_eq!(config.allowed_plugins.len(), 8);
        assert!(config.is_plugin_allowed("libgazebo_ros_camera.so"));
        assert!(!config.is_plugin_allowed("libcustom_unapproved.so"));
        assert_eq!(config.model_collisions, ModelCollisionPolicy::LastWins);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = StageConfig::from_toml(
            r#"
                anchor_package = "my_world"
                model_collisions = "error"

                [stage]
                anchor_folders = ["worlds"]
            "#,
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.anchor_package, "my_world");
        assert_eq!(config.model_collisions, ModelCollisionPolicy::Error);
        assert_eq!(config.stage.anchor_folders, vec![PathBuf::from("worlds")]);
        assert_eq!(config.stage.gzweb_folders.len(), 2);
        assert_eq!(config.resource_path_var, "GAZEBO_RESOURCE_PATH");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = StageConfig::from_toml("anchr_package = 'x'", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StageConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn extension_sets_are_case_insensitive() {
        let set = ExtensionSet::new(["STL", ".Dae"]);
        assert!(set.contains(Path::new("a/b/wheel.stl")));
        assert!(set.contains(Path::new("a/b/WHEEL.STL")));
        assert!(set.contains(Path::new("mesh.dae")));
        assert!(!set.contains(Path::new("script.py")));
        assert!(!set.contains(Path::new("Makefile")));
    }

    #[test]
    fn extension_sets_deserialize_from_lists() {
        let config = StageConfig::from_toml(
            "[stage]\ngzweb_extensions = [\"png\", \".JPG\"]",
            Path::new("x.toml"),
        )
        .unwrap();
        assert!(config.stage.gzweb_extensions.contains(Path::new("t.jpg")));
        assert!(config.stage.gzweb_extensions.contains(Path::new("t.png")));
        assert!(!config.stage.gzweb_extensions.contains(Path::new("t.dae")));
    }

    #[test]
    fn gazebo_keeps_xml_gzweb_does_not() {
        let layout = StageLayout::default();
        assert!(layout.gazebo_extensions.contains(Path::new("package.xml")));
        assert!(!layout.gzweb_extensions.contains(Path::new("package.xml")));
    }
}
