#![doc = include_str!("../README.md")]

mod analyzer;
mod directive;
mod error;
mod parser;
mod reach;

pub use analyzer::{
    Package,
    PackageError,
    PackageTree,
    SOURCE_EXTENSION,
    TEST_SUFFIX,
    TreeEntry,
    list_packages,
};
pub use directive::{DIRECTIVE_PREFIX, DirectiveExpr};
pub use error::Error;
pub use reach::{IgnoreSet, ReachEntry, ReachMap, ReachQuery};

/// Returns whether an import path belongs to the default standard-library
/// set.
///
/// Import paths of hosted projects start with a host name, so a path whose
/// first segment contains no `.` is treated as standard. Callers with other
/// conventions supply their own predicate to [`PackageTree::reach`].
pub fn default_is_standard(import_path: &str) -> bool {
    !import_path
        .split('/')
        .next()
        .unwrap_or_default()
        .contains('.')
}
