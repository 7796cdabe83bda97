//! The per-source cache.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, RwLock},
};

use verdep_tree::PackageTree;
use verdep_types::{Lock, Manifest, PairedVersion, Revision, UnpairedVersion};

/// Run-independent cached knowledge about one upstream repository.
///
/// One instance exists per upstream; all of its contents are immutable
/// once inserted, so readers share them through [`Arc`]s. A single
/// read-write lock guards the maps of each cache.
#[derive(Debug, Default)]
pub struct SourceCache {
    inner: RwLock<CacheInner>,
    /// Serializes version-list fetches so concurrent misses fold into
    /// one gateway call.
    fetch_lock: Mutex<()>,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// The upstream's version list in the order the gateway produced it.
    version_list: Option<Arc<Vec<PairedVersion>>>,
    /// Package trees per revision.
    trees: HashMap<Revision, Arc<PackageTree>>,
    /// Manifest and lock per (revision, analyzer key).
    project_info: HashMap<(Revision, String), (Manifest, Option<Lock>)>,
    /// Which revision each surface version resolves to.
    unpaired_to_revision: HashMap<UnpairedVersion, Revision>,
    /// All surface versions sharing a revision.
    revision_to_unpaired: HashMap<Revision, Vec<UnpairedVersion>>,
}

impl SourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached version list, if one was stored.
    pub fn version_list(&self) -> Option<Arc<Vec<PairedVersion>>> {
        self.inner.read().expect("poisoned source cache lock").version_list.clone()
    }

    /// Takes the fetch guard serializing version-list retrieval.
    ///
    /// Callers re-check [`SourceCache::version_list`] after acquiring the
    /// guard; a concurrent fetch may have filled it in the meantime.
    pub fn lock_for_fetch(&self) -> MutexGuard<'_, ()> {
        self.fetch_lock.lock().expect("poisoned source cache lock")
    }

    /// Stores a version list and indexes its version/revision pairings.
    pub fn set_version_list(&self, list: Vec<PairedVersion>) -> Arc<Vec<PairedVersion>> {
        let list = Arc::new(list);
        let mut inner = self.inner.write().expect("poisoned source cache lock");
        inner.unpaired_to_revision.clear();
        inner.revision_to_unpaired.clear();
        for paired in list.iter() {
            inner
                .unpaired_to_revision
                .insert(paired.unpaired().clone(), paired.revision().clone());
            let unpaired = inner
                .revision_to_unpaired
                .entry(paired.revision().clone())
                .or_default();
            if !unpaired.contains(paired.unpaired()) {
                unpaired.push(paired.unpaired().clone());
            }
        }
        inner.version_list = Some(list.clone());
        list
    }

    /// Returns the cached package tree at `revision`, if one was stored.
    pub fn tree(&self, revision: &Revision) -> Option<Arc<PackageTree>> {
        self.inner
            .read()
            .expect("poisoned source cache lock")
            .trees
            .get(revision)
            .cloned()
    }

    /// Stores the package tree at `revision`.
    pub fn set_tree(&self, revision: Revision, tree: PackageTree) -> Arc<PackageTree> {
        let tree = Arc::new(tree);
        self.inner
            .write()
            .expect("poisoned source cache lock")
            .trees
            .insert(revision, tree.clone());
        tree
    }

    /// Returns the cached manifest and lock at `revision` as derived by
    /// the analyzer identified by `analyzer_key`.
    pub fn project_info(
        &self,
        revision: &Revision,
        analyzer_key: &str,
    ) -> Option<(Manifest, Option<Lock>)> {
        self.inner
            .read()
            .expect("poisoned source cache lock")
            .project_info
            .get(&(revision.clone(), analyzer_key.to_string()))
            .cloned()
    }

    /// Stores the manifest and lock derived at `revision`.
    pub fn set_project_info(
        &self,
        revision: Revision,
        analyzer_key: String,
        manifest: Manifest,
        lock: Option<Lock>,
    ) {
        self.inner
            .write()
            .expect("poisoned source cache lock")
            .project_info
            .insert((revision, analyzer_key), (manifest, lock));
    }

    /// Returns the revision a surface version resolves to, if known.
    pub fn revision_of(&self, unpaired: &UnpairedVersion) -> Option<Revision> {
        self.inner
            .read()
            .expect("poisoned source cache lock")
            .unpaired_to_revision
            .get(unpaired)
            .cloned()
    }

    /// Returns all surface versions known to resolve to `revision`.
    pub fn unpaired_for(&self, revision: &Revision) -> Vec<UnpairedVersion> {
        self.inner
            .read()
            .expect("poisoned source cache lock")
            .revision_to_unpaired
            .get(revision)
            .cloned()
            .unwrap_or_default()
    }
}
