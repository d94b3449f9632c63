//! The model index: model name → `model.sdf`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::ScanError;
use crate::config::ModelCollisionPolicy;

/// File name of the canonical per-model descriptor.
pub const MODEL_DESCRIPTOR: &str = "model.sdf";

static MODEL_URI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"model://(.+)").expect("model uri pattern is valid"));

/// Extract the model name from a `model://<name>` include URI.
pub fn parse_model_uri(uri: &str) -> Option<&str> {
    let name = MODEL_URI_PATTERN.captures(uri)?.get(1)?.as_str();
    let name = name.trim().trim_end_matches('/');
    (!name.is_empty()).then_some(name)
}

/// Maps each model name (the directory holding its `model.sdf`) to the
/// descriptor path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelIndex {
    models: BTreeMap<String, PathBuf>,
}

impl ModelIndex {
    /// Build the index from `model.sdf` paths given in walk order.
    ///
    /// With [`ModelCollisionPolicy::LastWins`] a repeated name keeps the
    /// later path; with [`ModelCollisionPolicy::Error`] it fails.
    pub fn build(
        files: impl IntoIterator<Item = PathBuf>,
        policy: ModelCollisionPolicy,
    ) -> Result<Self, ScanError> {
        let mut models: BTreeMap<String, PathBuf> = BTreeMap::new();

        for file in files {
            let Some(name) = model_name(&file) else {
                continue;
            };

            if let Some(previous) = models.get(&name) {
                match policy {
                    ModelCollisionPolicy::Error => {
                        return Err(ScanError::ModelCollision {
                            name,
                            first: previous.clone(),
                            second: file,
                        });
                    }
                    ModelCollisionPolicy::LastWins => {
                        tracing::warn!(
                            model = %name,
                            replaced = %previous.display(),
                            by = %file.display(),
                            "duplicate model name, keeping the last one"
                        );
                    }
                }
            }
            models.insert(name, file);
        }

        Ok(Self { models })
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.models.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn model_name(model_sdf: &Path) -> Option<String> {
    model_sdf
        .parent()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("model://maize_01", Some("maize_01"))]
    #[case::padded("  model://ground_plane \n", Some("ground_plane"))]
    #[case::trailing_slash("model://sun/", Some("sun"))]
    #[case::empty("model://", None)]
    #[case::other_scheme("file://maize_01", None)]
    fn model_uris(#[case] uri: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_model_uri(uri), expected);
    }

    #[test]
    fn names_come_from_parent_directories() {
        let index = ModelIndex::build(
            [
                PathBuf::from("/ws/src/vmf/models/maize_01/model.sdf"),
                PathBuf::from("/ws/src/vmf/models/ground/model.sdf"),
            ],
            ModelCollisionPolicy::LastWins,
        )
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("maize_01"),
            Some(Path::new("/ws/src/vmf/models/maize_01/model.sdf"))
        );
        assert_eq!(index.get("ground"), Some(Path::new("/ws/src/vmf/models/ground/model.sdf")));
    }

    #[test]
    fn last_occurrence_wins_by_default() {
        let index = ModelIndex::build(
            [
                PathBuf::from("/ws/src/a_pkg/models/box/model.sdf"),
                PathBuf::from("/ws/src/b_pkg/models/box/model.sdf"),
            ],
            ModelCollisionPolicy::LastWins,
        )
        .unwrap();
        assert_eq!(
            index.get("box"),
            Some(Path::new("/ws/src/b_pkg/models/box/model.sdf"))
        );
    }

    #[test]
    fn collisions_can_be_fatal() {
        let err = ModelIndex::build(
            [
                PathBuf::from("/ws/src/a_pkg/models/box/model.sdf"),
                PathBuf::from("/ws/src/b_pkg/models/box/model.sdf"),
            ],
            ModelCollisionPolicy::Error,
        )
        .unwrap_err();

        match err {
            ScanError::ModelCollision { name, first, second } => {
                assert_eq!(name, "box");
                assert!(first.starts_with("/ws/src/a_pkg"));
                assert!(second.starts_with("/ws/src/b_pkg"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
