//! The standard checks, in the order they run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use simstage_glob::FileWalker;
use simstage_types::ValidationOutcome;

use super::pipeline::Check;
use crate::descriptor::Descriptor;
use crate::workspace::{EnvironmentError, ScanError, Workspace};

const TEXTURE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Resource roots, world file, dependencies, meshes, plugins.
pub fn standard_checks() -> Vec<Check> {
    vec![
        Check::new("Find gazebo resources", find_gazebo_resources),
        Check::new("World file", world_file),
        Check::new("Dependencies", dependencies),
        Check::new("Mesh files", mesh_files),
        Check::new("Gazebo plugins", gazebo_plugins),
    ]
}

/// The material resource folder must be reachable from the resource
/// search path.
pub fn find_gazebo_resources(ws: &Workspace) -> ValidationOutcome {
    match ws.material_resource_folder() {
        Ok(folder) => ValidationOutcome::ok(format!(
            "Found gazebo material resource folder in '{}'",
            folder.display()
        )),
        Err(EnvironmentError::Unset { var }) => ValidationOutcome::error(format!(
            "{var} is not set! Did you source Gazebo in your .bashrc file? If not, try adding \
             'source /usr/share/gazebo/setup.bash' to your bash file."
        )),
        Err(EnvironmentError::NoValidRoot { .. }) => ValidationOutcome::error(
            "Could not find the gazebo material resource folder! Check your Gazebo installation.",
        ),
    }
}

/// The generated world must be in use, and no used world or model file may
/// contain an empty `materials` element.
pub fn world_file(ws: &Workspace) -> ValidationOutcome {
    let files = match ws.used_model_files() {
        Ok(files) => files,
        Err(e) => return scan_failure(&e),
    };
    let canonical = &ws.config().canonical_world;
    let mut found = false;

    for file in &files {
        found |= file.ends_with(canonical);

        let descriptor = match Descriptor::open(file) {
            Ok(descriptor) => descriptor,
            Err(e) => return ValidationOutcome::error(e.to_string()),
        };
        if descriptor.find_all("materials").any(|m| !m.has_text()) {
            return ValidationOutcome::error(format!(
                "The model file '{}' contains empty <materials></materials> tags. This breaks \
                 visualisation of the environment. Update the {} package to the newest version \
                 or remove the empty <materials></materials> tags from the file.",
                file.display(),
                ws.config().anchor_package
            ));
        }
    }

    if !found {
        return ValidationOutcome::error(format!(
            "Could not find your generated world file at '(..)/{}'. Generate a world file with \
             'rosrun {} generate_world.py'.",
            canonical.display(),
            ws.config().anchor_package
        ));
    }

    ValidationOutcome::ok("World file is correct.")
}

/// Resolve everything the launch files need. Incomplete dependency
/// information is only a warning.
pub fn dependencies(ws: &Workspace) -> ValidationOutcome {
    match ws.dependent_packages() {
        Ok(packages) => {
            let list: Vec<&str> = packages.iter().map(String::as_str).collect();
            ValidationOutcome::ok(format!("Need resources from [{}]", list.join(", ")))
        }
        Err(e) if e.is_resolution_failure() => ValidationOutcome::warning(format!(
            "Could not resolve all dependencies of the launch files: '{e}'."
        )),
        Err(e) => scan_failure(&e),
    }
}

/// Textures referenced from meshes must live in the model's texture
/// folder.
pub fn mesh_files(ws: &Workspace) -> ValidationOutcome {
    let files = match ws.used_model_files() {
        Ok(files) => files,
        Err(e) => return scan_failure(&e),
    };
    let texture_dir = ws.config().texture_dir.as_str();
    let mut meshes: BTreeSet<PathBuf> = BTreeSet::new();

    for file in &files {
        let Some(model_dir) = file.parent() else {
            continue;
        };
        let found = match FileWalker::new(model_dir).include("*.dae").walk() {
            Ok(found) => found,
            Err(e) => return ValidationOutcome::error(e.to_string()),
        };

        for mesh in found {
            if !meshes.insert(mesh.clone()) {
                continue;
            }
            let descriptor = match Descriptor::open(&mesh) {
                Ok(descriptor) => descriptor,
                Err(e) => return ValidationOutcome::error(e.to_string()),
            };

            for init in descriptor.find_all_local("init_from") {
                let Some(texture) = init.text() else {
                    continue;
                };
                let is_image = TEXTURE_EXTENSIONS.iter().any(|ext| texture.ends_with(ext));
                if is_image && !texture.contains(texture_dir) {
                    return misplaced_texture(&mesh, texture, texture_dir);
                }
            }
        }
    }

    ValidationOutcome::ok(format!(
        "All {} meshes in {} models files are valid",
        meshes.len(),
        files.len()
    ))
}

/// Every plugin loaded by a required descriptor must be allow-listed.
pub fn gazebo_plugins(ws: &Workspace) -> ValidationOutcome {
    let descriptors = match ws.used_descriptors() {
        Ok(descriptors) => descriptors,
        Err(e) => return scan_failure(&e),
    };
    let config = ws.config();
    let mut used: Vec<&str> = Vec::new();

    for descriptor in &descriptors {
        let file_name = display_name(descriptor.path());

        for plugin in descriptor.find_all("plugin") {
            let Some(filename) = plugin.attr("filename") else {
                return ValidationOutcome::error(format!(
                    "A Gazebo plugin in '{file_name}' has no filename attribute"
                ));
            };
            if !config.is_plugin_allowed(filename) {
                return ValidationOutcome::error(format!(
                    "Gazebo plugin '{filename}' used in '{file_name}' is not allowed in the \
                     competition! Allowed sensor plugins are: {}",
                    config.allowed_plugins.join(", ")
                ));
            }
            used.push(filename);
        }
    }

    ValidationOutcome::ok(format!(
        "All used Gazebo plugins ({}) are allowed",
        used.join(", ")
    ))
}

fn scan_failure(error: &ScanError) -> ValidationOutcome {
    ValidationOutcome::error(error.to_string())
}

fn misplaced_texture(mesh: &Path, texture: &str, texture_dir: &str) -> ValidationOutcome {
    let texture_name = texture.rsplit('/').next().unwrap_or(texture);
    let model_dir = mesh
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    let target = model_dir.join(texture_dir.trim_start_matches("../"));

    ValidationOutcome::error(format!(
        "Texture '{texture_name}' in '{}' should be placed in the folder '{}'. Move the file to \
         this folder and edit the '{}' file.",
        model_dir.display(),
        target.display(),
        display_name(mesh)
    ))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_error_names_texture_and_mesh() {
        let outcome = misplaced_texture(
            Path::new("/ws/src/models/crate/meshes/crate.dae"),
            "textures/wood.png",
            "../materials/textures",
        );
        assert!(outcome.is_error());
        assert!(outcome.message.contains("'wood.png'"));
        assert!(outcome.message.contains("'/ws/src/models/crate'"));
        assert!(outcome.message.contains("/ws/src/models/crate/materials/textures"));
        assert!(outcome.message.contains("'crate.dae'"));
    }

    #[test]
    fn display_name_prefers_file_name() {
        assert_eq!(display_name(Path::new("/a/b/robot.xacro")), "robot.xacro");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
