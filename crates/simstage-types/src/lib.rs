//! Pure data types shared across simstage crates.
//!
//! Nothing here touches the filesystem. The kernel produces these values,
//! the CLI renders them.

mod closure;
mod outcome;

pub use closure::{Closure, ResolvedReference};
pub use outcome::{Severity, ValidationOutcome};
