//! Collaborator interfaces of the source layer.
//!
//! The version-control backend and the manifest analyzer are external
//! collaborators. The source manager and bridge are generic over them
//! through the traits in this module.

use std::path::Path;

use verdep_tree::PackageTree;
use verdep_types::{Lock, Manifest, PairedVersion, ProjectIdentifier, ProjectRoot, Revision, Version};

use crate::{CancelToken, Error};

/// Identifying information of a manifest analyzer.
///
/// The pair feeds into the inputs digest, so changing either value
/// invalidates existing locks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalyzerInfo {
    /// The analyzer's name.
    pub name: String,
    /// The analyzer's version.
    pub version: String,
}

/// Derives manifests and locks from a project checkout on disk.
pub trait ManifestAnalyzer: Send + Sync {
    /// Reads the files at `path` and extracts the manifest and, if
    /// present, the lock of the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be read or parsed.
    fn derive_manifest_and_lock(
        &self,
        path: &Path,
        root: &ProjectRoot,
    ) -> Result<(Manifest, Option<Lock>), Error>;

    /// Returns the analyzer's identifying information.
    fn info(&self) -> AnalyzerInfo;
}

/// The version-control backend operations the resolver needs.
///
/// Implementations resolve a [`ProjectIdentifier`] to one upstream
/// repository (through [`ProjectIdentifier::normalized_source`]) and
/// answer queries about it. All operations take a [`CancelToken`] and are
/// expected to return [`Error::Canceled`] promptly once it fires.
pub trait SourceGateway: Send + Sync {
    /// Returns whether the upstream for `ident` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if reaching upstream fails in a way that does not
    /// answer the question.
    fn source_exists(&self, ident: &ProjectIdentifier, cancel: &CancelToken)
    -> Result<bool, Error>;

    /// Fetches the latest refs of the upstream into the local cache.
    ///
    /// Must be idempotent and safe to call concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream cannot be fetched.
    fn sync_source(&self, ident: &ProjectIdentifier, cancel: &CancelToken) -> Result<(), Error>;

    /// Lists the upstream's tags and branches, each paired with the
    /// revision it currently resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream cannot be queried.
    fn list_versions(
        &self,
        ident: &ProjectIdentifier,
        cancel: &CancelToken,
    ) -> Result<Vec<PairedVersion>, Error>;

    /// Returns whether `revision` exists in the upstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream cannot be queried.
    fn revision_present_in(
        &self,
        ident: &ProjectIdentifier,
        revision: &Revision,
        cancel: &CancelToken,
    ) -> Result<bool, Error>;

    /// Analyzes the project's packages at `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not exist or the checkout
    /// cannot be analyzed.
    fn list_packages_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        cancel: &CancelToken,
    ) -> Result<PackageTree, Error>;

    /// Derives the project's manifest and lock at `version` using
    /// `analyzer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not exist or the analyzer
    /// fails.
    fn manifest_and_lock_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        analyzer: &dyn ManifestAnalyzer,
        cancel: &CancelToken,
    ) -> Result<(Manifest, Option<Lock>), Error>;

    /// Writes the project's files at `version` into `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not exist or the export
    /// fails.
    fn export_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        target: &Path,
        cancel: &CancelToken,
    ) -> Result<(), Error>;

    /// Deduces the project root an import path belongs to.
    ///
    /// May require network lookups; results are cached and folded by the
    /// source manager, so implementations need not cache themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if no project root can be established.
    fn deduce_project_root(
        &self,
        import_path: &str,
        cancel: &CancelToken,
    ) -> Result<ProjectRoot, Error>;
}
