//! Error handling for verdep-source.

use std::path::PathBuf;

use thiserror::Error;
use verdep_types::{ProjectIdentifier, Revision, Version};

/// The error that can occur in the source layer.
///
/// Gateway implementations return these as well, so that upstream failures
/// flow through the cache and bridge unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The upstream of a project cannot be reached or does not resolve.
    #[error("source for {ident} is unreachable: {message}")]
    SourceUnreachable {
        /// The project whose upstream failed.
        ident: ProjectIdentifier,
        /// The rendered underlying failure.
        message: String,
    },

    /// A revision does not exist in a source.
    #[error("revision {revision} is not present in {ident}")]
    NonexistentRevision {
        /// The project that was queried.
        ident: ProjectIdentifier,
        /// The missing revision.
        revision: Revision,
    },

    /// A version does not exist in a source.
    #[error("version {version} does not exist in {ident}")]
    UnknownVersion {
        /// The project that was queried.
        ident: ProjectIdentifier,
        /// The unknown version.
        version: Version,
    },

    /// No project root can be deduced for an import path.
    #[error("cannot deduce a project root for {import_path:?}: {message}")]
    DeductionFailure {
        /// The import path that failed to deduce.
        import_path: String,
        /// The rendered underlying failure.
        message: String,
    },

    /// The cache directory is locked by another source manager.
    #[error("cache directory {path:?} is already locked; release the other source manager first")]
    CacheLocked {
        /// The contended cache directory.
        path: PathBuf,
    },

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

    /// A package tree walk failed.
    #[error(transparent)]
    Tree(#[from] verdep_tree::Error),

    /// A type could not be constructed from gateway data.
    #[error(transparent)]
    Types(#[from] verdep_types::Error),

    /// The operation was canceled.
    #[error("operation canceled")]
    Canceled,
}
