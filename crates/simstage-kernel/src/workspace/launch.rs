//! Root descriptors named by launch files.
//!
//! Launch files are free text as far as the scanner is concerned. Any
//! `$(find <package>)` immediately followed by a path ending in a
//! descriptor extension names a root:
//!
//! ```text
//! <param name="robot_description"
//!        command="xacro '$(find my_robot)/urdf/robot.urdf.xacro'"/>
//! ```

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

static LAUNCH_ROOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$\(find\s+([^\s)]+)\)([^\s"'<>]+\.(?:xacro|urdf|sdf|world))\b"#)
        .expect("launch root pattern is valid")
});

/// A `(package, relative path)` pair found in launch-file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReference {
    pub package: String,
    /// Path inside the package, leading `/` stripped.
    pub relative: String,
    /// The matched text, for diagnostics.
    pub matched: String,
}

/// A launch reference resolved to an existing descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRoot {
    pub launch_file: PathBuf,
    pub package: String,
    pub path: PathBuf,
}

/// Extract every root descriptor reference from launch-file text.
pub fn extract_launch_references(text: &str) -> Vec<LaunchReference> {
    LAUNCH_ROOT_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let matched = caps.get(0)?.as_str().to_string();
            let package = caps.get(1)?.as_str().to_string();
            let relative = caps.get(2)?.as_str().trim_start_matches('/').to_string();
            Some(LaunchReference {
                package,
                relative,
                matched,
            })
        })
        .collect()
}
