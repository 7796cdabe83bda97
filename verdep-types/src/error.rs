//! Error handling for verdep-types.

use thiserror::Error;

/// The error that can occur when constructing verdep types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An import path prefix that cannot identify a project.
    #[error("invalid project root {0:?}")]
    InvalidProjectRoot(String),

    /// A revision built from an empty string.
    #[error("revisions must be non-empty")]
    EmptyRevision,

    /// A semantic version that does not parse.
    #[error("invalid semantic version {input:?}: {reason}")]
    InvalidSemver {
        /// The rejected input.
        input: String,
        /// The parse failure reported for the input.
        reason: String,
    },

    /// A semver range expression that does not parse.
    #[error("invalid semver range {0:?}")]
    InvalidRange(String),

    /// A locked project carrying both a branch and a version.
    #[error("locked project {0:?} carries both a branch and a version")]
    BranchAndVersion(String),

    /// An inputs digest that is not 64 hex characters.
    #[error("invalid inputs digest {0:?}")]
    InvalidDigest(String),
}
