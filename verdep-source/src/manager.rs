//! The process-wide source manager.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        Condvar,
        Mutex,
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use log::debug;
use verdep_tree::PackageTree;
use verdep_types::{
    Lock,
    Manifest,
    PairedVersion,
    ProjectIdentifier,
    ProjectRoot,
    Revision,
    Version,
};

use crate::{CancelToken, Error, ManifestAnalyzer, SourceCache, SourceGateway};

/// The name of the advisory lock file in the cache directory.
const LOCK_FILE_NAME: &str = "verdep-cache.lock";

/// The result of a deduction, in a form that can be handed to several
/// waiting callers.
type DeductionOutcome = Result<ProjectRoot, String>;

/// A single in-flight deduction that later callers wait on.
#[derive(Debug, Default)]
struct DeductionSlot {
    outcome: Mutex<Option<DeductionOutcome>>,
    ready: Condvar,
}

/// Caching front of a [`SourceGateway`], shared by all solve runs of a
/// process.
///
/// The manager holds one [`SourceCache`] per upstream repository (keyed by
/// the identifier's normalized source), folds concurrent deductions of
/// the same import path into one gateway call, and holds an advisory lock
/// on its cache directory for its lifetime.
pub struct SourceManager {
    gateway: Arc<dyn SourceGateway>,
    cache_dir: PathBuf,
    caches: RwLock<HashMap<String, Arc<SourceCache>>>,
    deduced: RwLock<HashMap<String, ProjectRoot>>,
    deductions: Mutex<HashMap<String, Arc<DeductionSlot>>>,
    released: AtomicBool,
}

impl SourceManager {
    /// Creates a source manager over `gateway`, locking `cache_dir`.
    ///
    /// The directory is created if it does not exist. Constructing a
    /// second manager against the same directory fails while the first
    /// has not been released, unless `force` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheLocked`] on lock contention and an I/O error
    /// if the directory or lock file cannot be created.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        gateway: Arc<dyn SourceGateway>,
        force: bool,
    ) -> Result<Self, Error> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|source| Error::IoPath {
            path: cache_dir.clone(),
            context: "creating cache directory",
            source,
        })?;
        let lock_path = cache_dir.join(LOCK_FILE_NAME);
        if force {
            fs::File::create(&lock_path).map_err(|source| Error::IoPath {
                path: lock_path.clone(),
                context: "creating cache lock file",
                source,
            })?;
        } else {
            match fs::File::create_new(&lock_path) {
                Ok(_) => {}
                Err(source) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Err(Error::CacheLocked { path: cache_dir });
                }
                Err(source) => {
                    return Err(Error::IoPath {
                        path: lock_path,
                        context: "creating cache lock file",
                        source,
                    });
                }
            }
        }

        Ok(Self {
            gateway,
            cache_dir,
            caches: RwLock::new(HashMap::new()),
            deduced: RwLock::new(HashMap::new()),
            deductions: Mutex::new(HashMap::new()),
            released: AtomicBool::new(false),
        })
    }

    /// Returns the directory this manager holds locked.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Releases the advisory lock on the cache directory.
    ///
    /// Safe to call more than once; only the first call removes the lock
    /// file. Dropping the manager releases implicitly.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let lock_path = self.cache_dir.join(LOCK_FILE_NAME);
        if let Err(error) = fs::remove_file(&lock_path) {
            debug!("failed to remove cache lock file {lock_path:?}: {error}");
        }
    }

    /// Returns the cache for the upstream `ident` resolves through.
    pub fn cache_for(&self, ident: &ProjectIdentifier) -> Arc<SourceCache> {
        let key = ident.normalized_source();
        if let Some(cache) = self
            .caches
            .read()
            .expect("poisoned source manager lock")
            .get(key)
        {
            return cache.clone();
        }
        self.caches
            .write()
            .expect("poisoned source manager lock")
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Returns whether the upstream for `ident` resolves.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn source_exists(
        &self,
        ident: &ProjectIdentifier,
        cancel: &CancelToken,
    ) -> Result<bool, Error> {
        self.gateway.source_exists(ident, cancel)
    }

    /// Fetches the latest refs for `ident` into the local cache.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn sync_source(
        &self,
        ident: &ProjectIdentifier,
        cancel: &CancelToken,
    ) -> Result<(), Error> {
        self.gateway.sync_source(ident, cancel)
    }

    /// Lists the versions of `ident`, fetching them once per upstream.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn list_versions(
        &self,
        ident: &ProjectIdentifier,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<PairedVersion>>, Error> {
        let cache = self.cache_for(ident);
        if let Some(list) = cache.version_list() {
            return Ok(list);
        }
        // Concurrent misses for the same upstream fold into one fetch.
        let _fetching = cache.lock_for_fetch();
        if let Some(list) = cache.version_list() {
            return Ok(list);
        }
        debug!("fetching version list for {ident}");
        let list = self.gateway.list_versions(ident, cancel)?;
        Ok(cache.set_version_list(list))
    }

    /// Returns whether `revision` exists in the upstream for `ident`.
    ///
    /// A revision that the cached version list already pairs is answered
    /// without consulting the gateway.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn revision_present_in(
        &self,
        ident: &ProjectIdentifier,
        revision: &Revision,
        cancel: &CancelToken,
    ) -> Result<bool, Error> {
        let cache = self.cache_for(ident);
        if !cache.unpaired_for(revision).is_empty() {
            return Ok(true);
        }
        self.gateway.revision_present_in(ident, revision, cancel)
    }

    /// Analyzes the packages of `ident` at `version`, memoized by the
    /// revision the version resolves to.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn list_packages_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        cancel: &CancelToken,
    ) -> Result<Arc<PackageTree>, Error> {
        let cache = self.cache_for(ident);
        let revision = self.resolve_revision(&cache, version);
        if let Some(revision) = &revision {
            if let Some(tree) = cache.tree(revision) {
                return Ok(tree);
            }
        }
        debug!("analyzing packages of {ident} at {version}");
        let tree = self.gateway.list_packages_at(ident, version, cancel)?;
        match revision {
            Some(revision) => Ok(cache.set_tree(revision, tree)),
            None => Ok(Arc::new(tree)),
        }
    }

    /// Derives the manifest and lock of `ident` at `version`, memoized by
    /// revision and analyzer.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn manifest_and_lock_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        analyzer: &dyn ManifestAnalyzer,
        cancel: &CancelToken,
    ) -> Result<(Manifest, Option<Lock>), Error> {
        let cache = self.cache_for(ident);
        let info = analyzer.info();
        let analyzer_key = format!("{}/{}", info.name, info.version);
        let revision = self.resolve_revision(&cache, version);
        if let Some(revision) = &revision {
            if let Some(cached) = cache.project_info(revision, &analyzer_key) {
                return Ok(cached);
            }
        }
        debug!("deriving manifest of {ident} at {version}");
        let (manifest, lock) = self
            .gateway
            .manifest_and_lock_at(ident, version, analyzer, cancel)?;
        if let Some(revision) = revision {
            cache.set_project_info(revision, analyzer_key, manifest.clone(), lock.clone());
        }
        Ok((manifest, lock))
    }

    /// Writes the files of `ident` at `version` into `target`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn export_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        target: &Path,
        cancel: &CancelToken,
    ) -> Result<(), Error> {
        self.gateway.export_at(ident, version, target, cancel)
    }

    /// Deduces the project root `import_path` belongs to.
    ///
    /// Successful deductions are cached for the life of the manager.
    /// Concurrent callers asking for the same path are folded into a
    /// single gateway call; the later callers block until the first
    /// completes and then share its outcome.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; waiters receive a
    /// [`Error::DeductionFailure`] carrying the leader's failure.
    pub fn deduce_project_root(
        &self,
        import_path: &str,
        cancel: &CancelToken,
    ) -> Result<ProjectRoot, Error> {
        if let Some(root) = self
            .deduced
            .read()
            .expect("poisoned source manager lock")
            .get(import_path)
        {
            return Ok(root.clone());
        }

        let (slot, leader) = {
            let mut in_flight = self
                .deductions
                .lock()
                .expect("poisoned source manager lock");
            match in_flight.get(import_path) {
                Some(slot) => (slot.clone(), false),
                None => {
                    let slot = Arc::new(DeductionSlot::default());
                    in_flight.insert(import_path.to_string(), slot.clone());
                    (slot, true)
                }
            }
        };

        if leader {
            let result = self.gateway.deduce_project_root(import_path, cancel);
            if let Ok(root) = &result {
                self.deduced
                    .write()
                    .expect("poisoned source manager lock")
                    .insert(import_path.to_string(), root.clone());
            }
            let outcome = result
                .as_ref()
                .map(Clone::clone)
                .map_err(ToString::to_string);
            {
                let mut ready = slot.outcome.lock().expect("poisoned deduction slot");
                *ready = Some(outcome);
                slot.ready.notify_all();
            }
            self.deductions
                .lock()
                .expect("poisoned source manager lock")
                .remove(import_path);
            result
        } else {
            let mut outcome = slot.outcome.lock().expect("poisoned deduction slot");
            while outcome.is_none() {
                outcome = slot
                    .ready
                    .wait(outcome)
                    .expect("poisoned deduction slot");
            }
            match outcome.as_ref().map(Clone::clone) {
                Some(Ok(root)) => Ok(root),
                Some(Err(message)) => Err(Error::DeductionFailure {
                    import_path: import_path.to_string(),
                    message,
                }),
                None => unreachable!("waited until the outcome was set"),
            }
        }
    }

    /// Resolves a version to the revision it is known to map to, using
    /// only cached knowledge.
    fn resolve_revision(&self, cache: &SourceCache, version: &Version) -> Option<Revision> {
        if let Some(revision) = version.underlying() {
            return Some(revision.clone());
        }
        version.unpaired().and_then(|unpaired| cache.revision_of(unpaired))
    }
}

impl Drop for SourceManager {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    /// A gateway that fails every operation; enough for lock tests.
    #[derive(Debug)]
    struct UnreachableGateway;

    impl SourceGateway for UnreachableGateway {
        fn source_exists(
            &self,
            _: &ProjectIdentifier,
            _: &CancelToken,
        ) -> Result<bool, Error> {
            Ok(false)
        }

        fn sync_source(&self, _: &ProjectIdentifier, _: &CancelToken) -> Result<(), Error> {
            Ok(())
        }

        fn list_versions(
            &self,
            ident: &ProjectIdentifier,
            _: &CancelToken,
        ) -> Result<Vec<PairedVersion>, Error> {
            Err(Error::SourceUnreachable {
                ident: ident.clone(),
                message: "unreachable by construction".to_string(),
            })
        }

        fn revision_present_in(
            &self,
            _: &ProjectIdentifier,
            _: &Revision,
            _: &CancelToken,
        ) -> Result<bool, Error> {
            Ok(false)
        }

        fn list_packages_at(
            &self,
            ident: &ProjectIdentifier,
            _: &Version,
            _: &CancelToken,
        ) -> Result<PackageTree, Error> {
            Err(Error::SourceUnreachable {
                ident: ident.clone(),
                message: "unreachable by construction".to_string(),
            })
        }

        fn manifest_and_lock_at(
            &self,
            ident: &ProjectIdentifier,
            _: &Version,
            _: &dyn ManifestAnalyzer,
            _: &CancelToken,
        ) -> Result<(Manifest, Option<Lock>), Error> {
            Err(Error::SourceUnreachable {
                ident: ident.clone(),
                message: "unreachable by construction".to_string(),
            })
        }

        fn export_at(
            &self,
            ident: &ProjectIdentifier,
            _: &Version,
            _: &Path,
            _: &CancelToken,
        ) -> Result<(), Error> {
            Err(Error::SourceUnreachable {
                ident: ident.clone(),
                message: "unreachable by construction".to_string(),
            })
        }

        fn deduce_project_root(
            &self,
            import_path: &str,
            _: &CancelToken,
        ) -> Result<ProjectRoot, Error> {
            Err(Error::DeductionFailure {
                import_path: import_path.to_string(),
                message: "unreachable by construction".to_string(),
            })
        }
    }

    #[rstest]
    fn cache_directory_lock_contention() -> TestResult {
        let dir = tempdir()?;
        let first = SourceManager::new(dir.path(), Arc::new(UnreachableGateway), false)?;
        let second = SourceManager::new(dir.path(), Arc::new(UnreachableGateway), false);
        assert!(matches!(second, Err(Error::CacheLocked { .. })));

        // Forcing takes the lock over.
        let forced = SourceManager::new(dir.path(), Arc::new(UnreachableGateway), true);
        assert!(forced.is_ok());
        drop(forced);

        first.release();
        let third = SourceManager::new(dir.path(), Arc::new(UnreachableGateway), false);
        assert!(third.is_ok());
        Ok(())
    }

    #[rstest]
    fn release_is_idempotent() -> TestResult {
        let dir = tempdir()?;
        let manager = SourceManager::new(dir.path(), Arc::new(UnreachableGateway), false)?;
        manager.release();
        manager.release();
        drop(manager);
        Ok(())
    }
}
