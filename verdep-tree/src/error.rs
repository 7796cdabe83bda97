//! Error handling for verdep-tree.

use std::path::PathBuf;

use thiserror::Error;

/// The error that can occur while walking a package directory.
///
/// Per-package problems (malformed sources, conflicting package names,
/// local relative imports) are not errors of the walk; they are recorded as
/// error entries in the resulting tree, see
/// [`PackageError`](crate::PackageError).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error with path info for context.
    #[error("I/O error at path {path:?} while {context}:\n{source}")]
    IoPath {
        /// The path at which the error occurred.
        path: PathBuf,
        /// What was being done when the error occurred.
        context: &'static str,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file root of a walk is not a directory.
    #[error("package tree root {0:?} is not a directory")]
    NotADirectory(PathBuf),
}
