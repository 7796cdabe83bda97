//! The run-scoped bridge between the solver and the source manager.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use log::debug;
use verdep_tree::PackageTree;
use verdep_types::{
    Constraint,
    Lock,
    Manifest,
    ProjectIdentifier,
    ProjectRoot,
    Revision,
    Version,
    sort_for_downgrade,
    sort_for_upgrade,
};

use crate::{CancelToken, Error, ManifestAnalyzer, SourceManager};

/// The root project's data, supplied by the caller of a solve.
///
/// The bridge answers all queries about the root from this data; the
/// gateway is never consulted for the root project.
#[derive(Clone, Debug)]
pub struct RootContext {
    /// The root project's identifier.
    pub ident: ProjectIdentifier,
    /// The root project's analyzed package tree.
    pub tree: Arc<PackageTree>,
    /// The root project's manifest.
    pub manifest: Manifest,
    /// The root project's lock, if one exists.
    pub lock: Option<Lock>,
}

/// The authoritative matching and version-list layer of one solve run.
///
/// The bridge sorts each identifier's version list once per run (upgrade
/// or downgrade direction) and reconciles version comparisons across
/// types: when a shape-level comparison fails, the versions involved are
/// expanded into the union of everything known to share their revision
/// and the comparison is retried. The solver performs all version
/// comparisons through the bridge.
pub struct SolveBridge {
    manager: Arc<SourceManager>,
    analyzer: Arc<dyn ManifestAnalyzer>,
    root: RootContext,
    downgrade: bool,
    prefetch_concurrency: usize,
    lists: Mutex<HashMap<ProjectIdentifier, Arc<Vec<Version>>>>,
    lock_broken: AtomicBool,
    cancel: CancelToken,
}

impl SolveBridge {
    /// Creates a bridge for one solve run.
    ///
    /// `downgrade` fixes the sort direction of every version list served
    /// during the run. `prefetch_concurrency` bounds the parallelism of
    /// [`SolveBridge::break_lock`]; zero disables prefetching.
    pub fn new(
        manager: Arc<SourceManager>,
        analyzer: Arc<dyn ManifestAnalyzer>,
        root: RootContext,
        downgrade: bool,
        prefetch_concurrency: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            manager,
            analyzer,
            root,
            downgrade,
            prefetch_concurrency,
            lists: Mutex::new(HashMap::new()),
            lock_broken: AtomicBool::new(false),
            cancel,
        }
    }

    /// Returns the cancellation token of this run.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the root context of this run.
    pub fn root(&self) -> &RootContext {
        &self.root
    }

    /// Returns whether `ident` names the root project.
    pub fn is_root(&self, ident: &ProjectIdentifier) -> bool {
        ident.root() == self.root.ident.root()
    }

    /// Returns the sorted candidate versions of `ident`.
    ///
    /// The list is fetched and sorted once per run; every version queue
    /// for `ident` iterates this exact order.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn list_versions(&self, ident: &ProjectIdentifier) -> Result<Arc<Vec<Version>>, Error> {
        if let Some(list) = self
            .lists
            .lock()
            .expect("poisoned bridge lock")
            .get(ident)
        {
            return Ok(list.clone());
        }
        let paired = self.manager.list_versions(ident, &self.cancel)?;
        let mut versions: Vec<Version> = paired
            .iter()
            .map(|paired| Version::Paired(paired.clone()))
            .collect();
        if self.downgrade {
            sort_for_downgrade(&mut versions);
        } else {
            sort_for_upgrade(&mut versions);
        }
        let versions = Arc::new(versions);
        self.lists
            .lock()
            .expect("poisoned bridge lock")
            .insert(ident.clone(), versions.clone());
        Ok(versions)
    }

    /// Returns the package tree of `ident` at `version`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn list_packages(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
    ) -> Result<Arc<PackageTree>, Error> {
        if self.is_root(ident) {
            return Ok(self.root.tree.clone());
        }
        self.manager.list_packages_at(ident, version, &self.cancel)
    }

    /// Returns the manifest and lock of `ident` at `version`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn manifest_and_lock(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
    ) -> Result<(Manifest, Option<Lock>), Error> {
        if self.is_root(ident) {
            return Ok((self.root.manifest.clone(), self.root.lock.clone()));
        }
        self.manager
            .manifest_and_lock_at(ident, version, self.analyzer.as_ref(), &self.cancel)
    }

    /// Deduces the project root `import_path` belongs to.
    ///
    /// The root project's own paths short-circuit to the root.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn deduce_project_root(&self, import_path: &str) -> Result<ProjectRoot, Error> {
        if self.root.ident.root().contains(import_path) {
            return Ok(self.root.ident.root().clone());
        }
        self.manager.deduce_project_root(import_path, &self.cancel)
    }

    /// Returns whether `revision` exists in the upstream for `ident`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn revision_present(
        &self,
        ident: &ProjectIdentifier,
        revision: &Revision,
    ) -> Result<bool, Error> {
        self.manager.revision_present_in(ident, revision, &self.cancel)
    }

    /// Authoritatively decides whether `constraint` admits `version`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the union expansion.
    pub fn matches(
        &self,
        ident: &ProjectIdentifier,
        constraint: &Constraint,
        version: &Version,
    ) -> Result<bool, Error> {
        if constraint.matches(version) {
            return Ok(true);
        }
        let expanded = self.version_union(ident, version)?;
        if let Some(expanded) = expanded {
            if constraint.matches(&expanded) {
                return Ok(true);
            }
        }
        // The constraint side may equally need expansion, for example an
        // equality constraint on a bare branch checked against a revision.
        let constraint = self.expand_constraint(ident, constraint)?;
        match self.version_union(ident, version)? {
            Some(expanded) => Ok(constraint.matches(&expanded)),
            None => Ok(constraint.matches(version)),
        }
    }

    /// Authoritatively intersects two constraints on `ident`.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the union expansion.
    pub fn intersect(
        &self,
        ident: &ProjectIdentifier,
        left: &Constraint,
        right: &Constraint,
    ) -> Result<Constraint, Error> {
        let plain = left.intersect(right);
        if !plain.is_none() {
            return Ok(plain);
        }
        let left = self.expand_constraint(ident, left)?;
        let right = self.expand_constraint(ident, right)?;
        Ok(left.intersect(&right))
    }

    /// Authoritatively decides whether two constraints on `ident` can be
    /// satisfied by one version.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the union expansion.
    pub fn matches_any(
        &self,
        ident: &ProjectIdentifier,
        left: &Constraint,
        right: &Constraint,
    ) -> Result<bool, Error> {
        Ok(!self.intersect(ident, left, right)?.is_none())
    }

    /// Prefetches sources recorded in the root lock.
    ///
    /// Fires at most once per run. For every given project, the upstream
    /// is synced and its packages at the locked version are analyzed, in
    /// parallel bounded by the configured concurrency. Failures are
    /// logged and swallowed; this is purely anticipatory warming.
    pub fn break_lock(&self, projects: &[(ProjectIdentifier, Version)]) {
        if self.prefetch_concurrency == 0
            || projects.is_empty()
            || self.lock_broken.swap(true, Ordering::SeqCst)
        {
            return;
        }
        debug!("breaking lock, prefetching {} sources", projects.len());
        let next = std::sync::atomic::AtomicUsize::new(0);
        let workers = self.prefetch_concurrency.min(projects.len());
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some((ident, version)) = projects.get(index) else {
                            break;
                        };
                        if self.cancel.is_canceled() {
                            break;
                        }
                        if let Err(error) = self.manager.sync_source(ident, &self.cancel) {
                            debug!("lock-break sync of {ident} failed: {error}");
                            continue;
                        }
                        if let Err(error) =
                            self.manager.list_packages_at(ident, version, &self.cancel)
                        {
                            debug!("lock-break analysis of {ident} failed: {error}");
                        }
                    }
                });
            }
        });
    }

    /// Expands a version into the union of everything known to share its
    /// revision.
    ///
    /// Returns `None` when nothing beyond the version itself is known.
    /// The expansion pulls the identifier's version list so that the
    /// pairing maps are populated.
    fn version_union(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
    ) -> Result<Option<Version>, Error> {
        if self.is_root(ident) || matches!(version, Version::Union(_)) {
            return Ok(None);
        }
        self.list_versions(ident)?;
        let cache = self.manager.cache_for(ident);

        let revision = match version.underlying() {
            Some(revision) => Some(revision.clone()),
            None => version
                .unpaired()
                .and_then(|unpaired| cache.revision_of(unpaired)),
        };
        let Some(revision) = revision else {
            return Ok(None);
        };

        let mut members = vec![version.clone()];
        let bare = Version::Revision(revision.clone());
        if !members.contains(&bare) {
            members.push(bare);
        }
        for unpaired in cache.unpaired_for(&revision) {
            let paired = Version::Paired(unpaired.pair(revision.clone()));
            if !members.contains(&paired) {
                members.push(paired);
            }
        }
        if members.len() == 1 {
            return Ok(None);
        }
        Ok(Some(Version::Union(members)))
    }

    /// Replaces version constraints with their revision unions.
    fn expand_constraint(
        &self,
        ident: &ProjectIdentifier,
        constraint: &Constraint,
    ) -> Result<Constraint, Error> {
        match constraint {
            Constraint::Version(version) => Ok(match self.version_union(ident, version)? {
                Some(expanded) => Constraint::Version(expanded),
                None => constraint.clone(),
            }),
            Constraint::Union(members) => {
                let mut expanded = Vec::with_capacity(members.len());
                for member in members {
                    expanded.push(self.expand_constraint(ident, member)?);
                }
                Ok(Constraint::Union(expanded))
            }
            Constraint::Any | Constraint::None | Constraint::Range(_) => Ok(constraint.clone()),
        }
    }
}

impl std::fmt::Debug for SolveBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveBridge")
            .field("root", &self.root.ident)
            .field("downgrade", &self.downgrade)
            .finish_non_exhaustive()
    }
}
