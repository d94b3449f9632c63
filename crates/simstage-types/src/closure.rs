//! Dependency closures.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A reference that has been resolved to a concrete file.
///
/// `path` is absolute and existed when the reference was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedReference {
    /// Package the file belongs to.
    pub package: String,
    /// Absolute path of the file.
    pub path: PathBuf,
}

impl ResolvedReference {
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }
}

/// The set of packages and files reachable from some starting point.
///
/// Both halves are sets: insertion order is irrelevant and merging is a
/// plain union, so it is commutative, associative and idempotent. Sorted
/// storage keeps iteration (and therefore output) stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    packages: BTreeSet<String>,
    resources: BTreeSet<PathBuf>,
}

impl Closure {
    /// Create an empty closure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved reference.
    ///
    /// Returns `true` if the file was not already part of the closure.
    pub fn insert(&mut self, reference: ResolvedReference) -> bool {
        self.packages.insert(reference.package);
        self.resources.insert(reference.path)
    }

    /// Record a package without any file.
    pub fn insert_package(&mut self, package: impl Into<String>) -> bool {
        self.packages.insert(package.into())
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &Closure) {
        self.packages.extend(other.packages.iter().cloned());
        self.resources.extend(other.resources.iter().cloned());
    }

    /// Union of two closures, consuming both.
    pub fn union(mut self, other: Closure) -> Closure {
        self.packages.extend(other.packages);
        self.resources.extend(other.resources);
        self
    }

    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub fn resources(&self) -> &BTreeSet<PathBuf> {
        &self.resources
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn contains_resource(&self, path: &Path) -> bool {
        self.resources.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.resources.is_empty()
    }
}

impl Extend<ResolvedReference> for Closure {
    fn extend<T: IntoIterator<Item = ResolvedReference>>(&mut self, iter: T) {
        for reference in iter {
            self.insert(reference);
        }
    }
}

impl FromIterator<ResolvedReference> for Closure {
    fn from_iter<T: IntoIterator<Item = ResolvedReference>>(iter: T) -> Self {
        let mut closure = Closure::new();
        closure.extend(iter);
        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(pkg: &str, file: &str) -> ResolvedReference {
        ResolvedReference::new(pkg, format!("/ws/{pkg}/{file}"))
    }

    #[test]
    fn insert_reports_new_files_only() {
        let mut closure = Closure::new();
        assert!(closure.insert(reference("foo_pkg", "urdf/robot.xacro")));
        assert!(!closure.insert(reference("foo_pkg", "urdf/robot.xacro")));
        assert!(closure.insert(reference("foo_pkg", "meshes/wheel.dae")));

        assert_eq!(closure.packages().len(), 1);
        assert_eq!(closure.resources().len(), 2);
    }

    #[test]
    fn merge_with_self_is_identity() {
        let closure: Closure = [reference("a", "x.urdf"), reference("b", "y.dae")]
            .into_iter()
            .collect();
        let mut merged = closure.clone();
        merged.merge(&closure);
        assert_eq!(merged, closure);
    }

    #[test]
    fn package_only_entries() {
        let mut closure = Closure::new();
        closure.insert_package("launch_pkg");
        assert!(closure.contains_package("launch_pkg"));
        assert!(closure.resources().is_empty());
        assert!(!closure.is_empty());
    }

    fn arb_closure() -> impl Strategy<Value = Closure> {
        prop::collection::vec(("[a-d]", "[a-f]\\.(urdf|dae|sdf)"), 0..12).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(pkg, file)| reference(&pkg, &file))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn union_is_commutative(a in arb_closure(), b in arb_closure()) {
            prop_assert_eq!(a.clone().union(b.clone()), b.union(a));
        }

        #[test]
        fn union_is_associative(a in arb_closure(), b in arb_closure(), c in arb_closure()) {
            let left = a.clone().union(b.clone()).union(c.clone());
            let right = a.union(b.union(c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn union_is_idempotent(a in arb_closure()) {
            prop_assert_eq!(a.clone().union(a.clone()), a);
        }

        #[test]
        fn merge_matches_union(a in arb_closure(), b in arb_closure()) {
            let mut merged = a.clone();
            merged.merge(&b);
            prop_assert_eq!(merged, a.union(b));
        }
    }
}
