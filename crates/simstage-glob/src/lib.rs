//! simstage-glob: file discovery for simstage.
//!
//! [`FileWalker`] is a deterministic, full-tree walker over the real
//! filesystem. It collects files whose names match gitignore-style globs
//! (`*.launch`, `model.sdf`), and can list directories too, with pruning
//! for crawls that stop at certain folders.
//!
//! Walk order is stable: entries are visited depth-first with siblings
//! sorted by file name, so "first" and "last" occurrences of a file are
//! well defined across runs and platforms.

mod walker;

pub use walker::{FileWalker, WalkEntry, WalkerError};
