//! The backtracking solver.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};

use log::debug;
use verdep_source::{AnalyzerInfo, CancelToken, ManifestAnalyzer, RootContext, SolveBridge, SourceManager};
use verdep_tree::{IgnoreSet, PackageTree, ReachQuery, default_is_standard};
use verdep_types::{
    Constraint,
    InputsDigest,
    Lock,
    LockedProject,
    Manifest,
    ProjectIdentifier,
    ProjectProperties,
    ProjectRoot,
    UnpairedVersion,
    Version,
};

use crate::{
    Error,
    SolveFailure,
    Solution,
    digest::hash_feed,
    queue::{BimodalItem, UnselectedQueue, VersionQueue},
    selection::{SelectedProject, Selection},
    types::{Atom, Dependency},
};

/// A predicate deciding whether an import path belongs to the standard
/// library and is therefore kept out of solving.
pub type StdlibPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default bound on lock-break prefetch parallelism.
const DEFAULT_PREFETCH_CONCURRENCY: usize = 8;

/// The caller-supplied inputs of one solve run.
pub struct SolveParameters {
    /// The root project's directory on disk.
    pub root_dir: PathBuf,
    /// The root project's analyzed package tree.
    pub root_tree: Arc<PackageTree>,
    /// The root project's manifest.
    pub manifest: Manifest,
    /// The root project's lock, if one exists.
    pub lock: Option<Lock>,
    /// Projects whose locked version must be ignored.
    pub to_change: BTreeSet<ProjectRoot>,
    /// Ignore locked versions globally.
    pub change_all: bool,
    /// Sort candidate versions for downgrade instead of upgrade.
    pub downgrade: bool,
    /// Extra reach-ignore patterns, merged with the manifest's.
    pub ignore: BTreeSet<String>,
    /// Emit a human-readable step log through [`log`].
    pub trace: bool,
    /// Fire the lock-break prefetch on the first lock mismatch.
    pub break_lock: bool,
    /// Bound on lock-break prefetch parallelism; zero disables it.
    pub prefetch_concurrency: usize,
    /// The standard-library predicate; `None` uses
    /// [`default_is_standard`].
    pub stdlib: Option<StdlibPredicate>,
}

impl SolveParameters {
    /// Creates parameters with default options.
    pub fn new(root_dir: impl Into<PathBuf>, root_tree: Arc<PackageTree>, manifest: Manifest) -> Self {
        Self {
            root_dir: root_dir.into(),
            root_tree,
            manifest,
            lock: None,
            to_change: BTreeSet::new(),
            change_all: false,
            downgrade: false,
            ignore: BTreeSet::new(),
            trace: false,
            break_lock: false,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            stdlib: None,
        }
    }
}

impl std::fmt::Debug for SolveParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveParameters")
            .field("root_dir", &self.root_dir)
            .field("change_all", &self.change_all)
            .field("downgrade", &self.downgrade)
            .finish_non_exhaustive()
    }
}

/// The solver state machine of one run.
///
/// Created by [`Solver::prepare`], which validates the inputs, and
/// consumed by [`Solver::solve`]. A solve mutates no external data; all
/// caches it warms live in the shared source manager.
pub struct Solver {
    params: SolveParameters,
    bridge: SolveBridge,
    root_atom: Atom,
    ovr: BTreeMap<ProjectRoot, ProjectProperties>,
    ignore: IgnoreSet,
    ignore_patterns: BTreeSet<String>,
    root_required: Vec<String>,
    stdlib: StdlibPredicate,
    analyzer_info: AnalyzerInfo,
    pub(crate) sel: Selection,
    unsel: UnselectedQueue,
    pub(crate) vqs: Vec<VersionQueue>,
    attempts: u64,
    cancel: CancelToken,
}

impl Solver {
    /// Validates the inputs and prepares a solve run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadOptions`] if the root directory does not
    /// exist, the root package tree is empty or inconsistent, or an
    /// import path is both required and ignored.
    pub fn prepare(
        params: SolveParameters,
        manager: Arc<SourceManager>,
        analyzer: Arc<dyn ManifestAnalyzer>,
        cancel: CancelToken,
    ) -> Result<Self, Error> {
        if !params.root_dir.is_dir() {
            return Err(Error::BadOptions(format!(
                "root directory {:?} does not exist or is not a directory",
                params.root_dir
            )));
        }
        let root = ProjectRoot::new(params.root_tree.import_root()).map_err(|error| {
            Error::BadOptions(format!("root package tree has an invalid import root: {error}"))
        })?;
        if params.root_tree.packages().is_empty() {
            return Err(Error::BadOptions(
                "root package tree contains no packages".to_string(),
            ));
        }

        let mut ignore_patterns = params.ignore.clone();
        ignore_patterns.extend(params.manifest.ignored().iter().cloned());
        let ignore = IgnoreSet::new(ignore_patterns.iter().cloned());
        for required in params.manifest.required() {
            if ignore.is_ignored(required) {
                return Err(Error::BadOptions(format!(
                    "import path {required:?} is both required and ignored"
                )));
            }
        }

        let stdlib: StdlibPredicate = params
            .stdlib
            .clone()
            .unwrap_or_else(|| Arc::new(default_is_standard));

        // The set of external import paths the root project needs, with
        // the required list added on top.
        let reach_query = ReachQuery {
            roots: None,
            include_tests: true,
            backprop: false,
            strict_cycles: false,
        };
        let predicate: &dyn Fn(&str) -> bool = &*stdlib;
        let reach = params.root_tree.reach(&reach_query, &ignore, predicate);
        let mut required_set: BTreeSet<String> = reach.external_union().into_iter().collect();
        required_set.extend(params.manifest.required().iter().cloned());
        let root_required: Vec<String> = required_set.into_iter().collect();

        let root_ident = ProjectIdentifier::from(root.clone());
        let bridge = SolveBridge::new(
            manager,
            analyzer.clone(),
            RootContext {
                ident: root_ident.clone(),
                tree: params.root_tree.clone(),
                manifest: params.manifest.clone(),
                lock: params.lock.clone(),
            },
            params.downgrade,
            params.prefetch_concurrency,
            cancel.clone(),
        );

        let lock_preserved: BTreeSet<ProjectRoot> = if params.change_all {
            BTreeSet::new()
        } else {
            params
                .lock
                .iter()
                .flat_map(Lock::projects)
                .map(|project| project.ident().root().clone())
                .filter(|locked_root| !params.to_change.contains(locked_root))
                .collect()
        };
        let unsel = UnselectedQueue::new(root.clone(), lock_preserved);

        let root_atom = Atom::new(
            root_ident,
            Version::Unpaired(UnpairedVersion::Plain("(root)".to_string())),
        );
        let ovr = params.manifest.overrides().clone();
        let analyzer_info = analyzer.info();

        Ok(Self {
            params,
            bridge,
            root_atom,
            ovr,
            ignore,
            ignore_patterns,
            root_required,
            stdlib,
            analyzer_info,
            sel: Selection::new(),
            unsel,
            vqs: Vec::new(),
            attempts: 0,
            cancel,
        })
    }

    /// Runs the solve to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`SolveFailure`] when no assignment satisfies the
    /// inputs, and source layer errors (including cancellation)
    /// immediately when they occur.
    pub fn solve(mut self) -> Result<Solution, Error> {
        self.check_cancel()?;
        let digest = self.hash_inputs();
        self.select_root()?;
        loop {
            self.check_cancel()?;
            let Some(item) = self.unsel.pop() else {
                break;
            };
            if item.ident.root() == self.root_atom.ident.root() {
                continue;
            }
            if self.sel.selected_atom(item.ident.root()).is_some() {
                self.absorb_packages(item)?;
            } else {
                if self.sel.depender_count(item.ident.root()) == 0 {
                    // Demand was retracted by backtracking.
                    continue;
                }
                self.attempt_selection(item)?;
            }
        }
        self.finish(digest)
    }

    /// Returns the canonical inputs-digest feed, element by element.
    ///
    /// The feed is: for each root-required import path in lexicographic
    /// order, the path followed by the effective source and non-universal
    /// constraint of the covering declared or overriding project root;
    /// the root directory; the ignore patterns, sorted; the required
    /// paths, sorted; the overrides sorted by root, each with its source
    /// and non-universal constraint; the analyzer name and version.
    pub fn digest_feed(&self) -> Vec<String> {
        let mut elements = Vec::new();
        for path in &self.root_required {
            elements.push(path.clone());
            let declared = self
                .params
                .manifest
                .constraints()
                .keys()
                .find(|declared_root| declared_root.contains(path));
            let overriding = self.ovr.keys().find(|ovr_root| ovr_root.contains(path));
            if let Some(covering) = declared.or(overriding) {
                let props =
                    self.effective_properties(covering, self.params.manifest.constraint_for(covering));
                if let Some(source) = &props.source {
                    elements.push(source.clone());
                }
                if !props.constraint.is_any() {
                    elements.push(props.constraint.to_string());
                }
            }
        }
        elements.push(self.params.root_dir.display().to_string());
        for pattern in &self.ignore_patterns {
            elements.push(pattern.clone());
        }
        for required in self.params.manifest.required() {
            elements.push(required.clone());
        }
        for (ovr_root, props) in &self.ovr {
            elements.push(ovr_root.to_string());
            if let Some(source) = &props.source {
                elements.push(source.clone());
            }
            if !props.constraint.is_any() {
                elements.push(props.constraint.to_string());
            }
        }
        elements.push(self.analyzer_info.name.clone());
        elements.push(self.analyzer_info.version.clone());
        elements
    }

    /// Hashes the canonical inputs feed.
    pub fn hash_inputs(&self) -> InputsDigest {
        hash_feed(&self.digest_feed())
    }

    fn check_cancel(&self) -> Result<(), Error> {
        Ok(self.cancel.check()?)
    }

    /// Selects the root project and seeds its dependencies.
    fn select_root(&mut self) -> Result<(), Error> {
        let deps = self.root_dependencies()?;
        let packages: Vec<String> = self.params.root_tree.packages().keys().cloned().collect();
        self.trace(format_args!(
            "select {} (root) with {} dependencies",
            self.root_atom.ident,
            deps.len()
        ));
        for dep in &deps {
            self.unsel.push(dep.ident.clone(), dep.packages.clone());
        }
        self.sel.select(SelectedProject {
            atom: self.root_atom.clone(),
            packages,
            first: true,
            introduced: deps,
        });
        Ok(())
    }

    /// Computes the root project's dependencies from its reach and
    /// manifest.
    fn root_dependencies(&self) -> Result<Vec<Dependency>, Error> {
        let mut grouped: BTreeMap<ProjectRoot, Vec<String>> = BTreeMap::new();
        for path in &self.root_required {
            let deduced = self.bridge.deduce_project_root(path)?;
            if &deduced == self.root_atom.ident.root() {
                continue;
            }
            grouped.entry(deduced).or_default().push(path.clone());
        }
        let mut deps = Vec::new();
        for (dep_root, packages) in grouped {
            let props =
                self.effective_properties(&dep_root, self.params.manifest.constraint_for(&dep_root));
            deps.push(Dependency {
                depender: self.root_atom.clone(),
                ident: props.identifier_for(dep_root),
                constraint: props.constraint,
                packages,
            });
        }
        Ok(deps)
    }

    /// Applies the root manifest's override for `root`, if any, on top of
    /// the declared properties.
    pub(crate) fn effective_properties(
        &self,
        root: &ProjectRoot,
        declared: Option<&ProjectProperties>,
    ) -> ProjectProperties {
        let mut props = declared.cloned().unwrap_or_else(|| ProjectProperties {
            source: None,
            constraint: Constraint::Any,
        });
        if let Some(ovr) = self.ovr.get(root) {
            if ovr.source.is_some() {
                props.source = ovr.source.clone();
            }
            if !ovr.constraint.is_any() {
                props.constraint = ovr.constraint.clone();
            }
        }
        props
    }

    /// Absorbs additional package demand into an already-selected
    /// project.
    ///
    /// Satisfiability is fully re-run for the atom with the union of
    /// demanded packages; a failure marks the project's version queue and
    /// backtracks.
    fn absorb_packages(&mut self, item: BimodalItem) -> Result<(), Error> {
        let root = item.ident.root().clone();
        let already = self.sel.selected_packages_of(&root);
        let new_packages: Vec<String> = item
            .packages
            .iter()
            .filter(|package| !already.contains(*package))
            .cloned()
            .collect();
        if new_packages.is_empty() {
            return Ok(());
        }
        let atom = self
            .sel
            .selected_atom(&root)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("absorbing packages into unselected {root}")))?;
        let mut union: BTreeSet<String> = already;
        union.extend(new_packages.iter().cloned());
        let union: Vec<String> = union.into_iter().collect();
        self.trace(format_args!(
            "absorb {} new packages into {atom}",
            new_packages.len()
        ));
        match self.satisfiable(&atom, &union)? {
            Ok(()) => {
                let deps = self.dependencies_of(&atom, &new_packages)?;
                for dep in &deps {
                    self.unsel.push(dep.ident.clone(), dep.packages.clone());
                }
                self.sel.select(SelectedProject {
                    atom,
                    packages: new_packages,
                    first: false,
                    introduced: deps,
                });
                Ok(())
            }
            Err(failure) => {
                self.trace(format_args!("fail {atom}: {}", failure.kind()));
                self.fail_project(&root);
                if let Some(vq) = self.vqs.iter_mut().find(|vq| vq.ident.root() == &root) {
                    vq.record_failure(atom.version.clone(), failure.clone());
                }
                // Keep the package demand alive across the backtrack.
                self.unsel.push(item.ident.clone(), item.packages.clone());
                if self.backtrack()? {
                    Ok(())
                } else {
                    Err(Error::Solve(failure))
                }
            }
        }
    }

    /// Attempts the first selection of a project.
    fn attempt_selection(&mut self, item: BimodalItem) -> Result<(), Error> {
        self.trace(format_args!("attempt {}", item.ident));
        let mut vq = self.create_version_queue(&item)?;
        match self.find_valid_version(&mut vq, &item.packages)? {
            Ok(version) => {
                let atom = Atom::new(item.ident.clone(), version);
                let deps = self.dependencies_of(&atom, &item.packages)?;
                self.trace(format_args!("select {atom}, {} dependencies", deps.len()));
                for dep in &deps {
                    self.unsel.push(dep.ident.clone(), dep.packages.clone());
                }
                self.sel.select(SelectedProject {
                    atom,
                    packages: item.packages,
                    first: true,
                    introduced: deps,
                });
                self.vqs.push(vq);
                self.attempts += 1;
                Ok(())
            }
            Err(failure) => {
                self.trace(format_args!("exhausted {}", item.ident));
                // The demand stays queued; whatever the backtrack changes,
                // the project must still be brought in if something keeps
                // depending on it.
                self.unsel.push(item.ident.clone(), item.packages.clone());
                if self.backtrack()? {
                    Ok(())
                } else {
                    Err(Error::Solve(failure))
                }
            }
        }
    }

    /// Creates the version queue for a first selection.
    ///
    /// The locked version heads the queue when the project has a lock
    /// entry that is not marked for change and still satisfies the
    /// constraints in force. Every path that goes to the sorted list
    /// instead fires the lock-break prefetch, when enabled.
    fn create_version_queue(&mut self, item: &BimodalItem) -> Result<VersionQueue, Error> {
        if let Some(locked) = self.lock_version_for(item.ident.root()) {
            let composite = self.composite_constraint(item.ident.root())?;
            if self.bridge.matches(&item.ident, &composite, &locked)? {
                self.trace(format_args!("lock hint {locked} for {}", item.ident));
                return Ok(VersionQueue::with_preferred(item.ident.clone(), locked));
            }
        }
        self.fire_lock_break();
        VersionQueue::from_bridge(item.ident.clone(), &self.bridge)
    }

    /// Returns the lock-preserved version for `root`, if preservation
    /// applies.
    fn lock_version_for(&self, root: &ProjectRoot) -> Option<Version> {
        if self.params.change_all || self.params.to_change.contains(root) {
            return None;
        }
        self.params
            .lock
            .as_ref()?
            .project_for(root)
            .map(LockedProject::version_pair)
    }

    /// Fires the lock-break prefetch for all not-yet-selected locked
    /// projects. The bridge guarantees this runs at most once per run.
    fn fire_lock_break(&self) {
        if !self.params.break_lock {
            return;
        }
        let Some(lock) = self.params.lock.as_ref() else {
            return;
        };
        let pending: Vec<(ProjectIdentifier, Version)> = lock
            .projects()
            .iter()
            .filter(|project| self.sel.selected_atom(project.ident().root()).is_none())
            .map(|project| (project.ident().clone(), project.version_pair()))
            .collect();
        self.bridge.break_lock(&pending);
    }

    /// Iterates a version queue until a satisfiable candidate is found.
    ///
    /// Returns the aggregate failure when the queue exhausts.
    fn find_valid_version(
        &mut self,
        vq: &mut VersionQueue,
        packages: &[String],
    ) -> Result<Result<Version, SolveFailure>, Error> {
        loop {
            self.check_cancel()?;
            let Some(version) = vq.current().cloned() else {
                return Ok(Err(SolveFailure::NoVersionMatching {
                    ident: vq.ident.clone(),
                    causes: vq.fails.clone(),
                }));
            };
            let atom = Atom::new(vq.ident.clone(), version.clone());
            match self.satisfiable(&atom, packages)? {
                Ok(()) => return Ok(Ok(version)),
                Err(failure) => {
                    self.trace(format_args!("reject {atom}: {}", failure.kind()));
                    vq.record_failure(version, failure);
                    vq.advance(&self.bridge)?;
                }
            }
        }
    }

    /// Marks the version queue of `root` as failed, unless it is the
    /// root project.
    pub(crate) fn fail_project(&mut self, root: &ProjectRoot) {
        if root == self.root_atom.ident.root() {
            return;
        }
        if let Some(vq) = self.vqs.iter_mut().find(|vq| vq.ident.root() == root) {
            vq.failed = true;
        }
    }

    /// Unwinds failed selections until an advanced version queue admits a
    /// new candidate.
    ///
    /// Returns false when no failed queue can advance any further; the
    /// caller then surfaces the failure that triggered backtracking.
    fn backtrack(&mut self) -> Result<bool, Error> {
        loop {
            // Package-only selections carry no version queue; they unwind
            // first.
            while self
                .sel
                .projects()
                .last()
                .is_some_and(|selected| !selected.first)
            {
                self.unselect_last();
            }
            let Some(top) = self.vqs.last() else {
                return Ok(false);
            };
            if !top.failed {
                // This selection is not to blame; discard it wholesale.
                self.unselect_last();
                self.vqs.pop();
                continue;
            }
            let mut vq = self
                .vqs
                .pop()
                .ok_or_else(|| Error::Internal("version queue stack emptied mid-backtrack".to_string()))?;
            vq.failed = false;
            let Some(removed) = self.unselect_last() else {
                return Err(Error::Internal(
                    "selection stack empty while version queues remain".to_string(),
                ));
            };
            self.trace(format_args!("backtrack to {}", vq.ident));
            vq.advance(&self.bridge)?;
            match self.find_valid_version(&mut vq, &removed.packages)? {
                Ok(version) => {
                    let atom = Atom::new(vq.ident.clone(), version);
                    let deps = self.dependencies_of(&atom, &removed.packages)?;
                    self.trace(format_args!("reselect {atom}"));
                    for dep in &deps {
                        self.unsel.push(dep.ident.clone(), dep.packages.clone());
                    }
                    self.sel.select(SelectedProject {
                        atom,
                        packages: removed.packages,
                        first: true,
                        introduced: deps,
                    });
                    self.vqs.push(vq);
                    self.attempts += 1;
                    return Ok(true);
                }
                // Exhausted as well; the queues to blame further up were
                // marked during the attempts.
                Err(_) => continue,
            }
        }
    }

    /// Pops the top selection, retracts its dependencies from the queue
    /// and requeues the project if it is still demanded.
    fn unselect_last(&mut self) -> Option<SelectedProject> {
        let removed = self.sel.unselect_last()?;
        for dep in &removed.introduced {
            if self.sel.depender_count(dep.ident.root()) == 0 {
                self.unsel.remove_all(dep.ident.root());
            }
        }
        if self.sel.depender_count(removed.atom.ident.root()) > 0 {
            self.unsel
                .push(removed.atom.ident.clone(), removed.packages.clone());
        }
        self.trace(format_args!("unselect {}", removed.atom));
        Some(removed)
    }

    /// Computes the dependencies `atom` introduces, restricted to the
    /// given required packages.
    ///
    /// Dependencies are ordered alphabetically by project root so that
    /// identical inputs produce identical attempt counts.
    pub(crate) fn dependencies_of(
        &self,
        atom: &Atom,
        packages: &[String],
    ) -> Result<Vec<Dependency>, Error> {
        if atom.ident.root() == self.root_atom.ident.root() {
            return self.root_dependencies();
        }
        let (manifest, _lock) = self.bridge.manifest_and_lock(&atom.ident, &atom.version)?;
        let tree = self.bridge.list_packages(&atom.ident, &atom.version)?;
        let query = ReachQuery {
            roots: Some(packages),
            include_tests: false,
            backprop: false,
            strict_cycles: false,
        };
        let predicate: &dyn Fn(&str) -> bool = &*self.stdlib;
        let reach = tree.reach(&query, &self.ignore, predicate);

        let mut grouped: BTreeMap<ProjectRoot, Vec<String>> = BTreeMap::new();
        for path in reach.external_union() {
            let deduced = self.bridge.deduce_project_root(&path)?;
            if &deduced == self.root_atom.ident.root() {
                // The root project is always selected; constraints on it
                // cannot participate.
                continue;
            }
            grouped.entry(deduced).or_default().push(path);
        }
        let mut deps = Vec::new();
        for (dep_root, dep_packages) in grouped {
            let props = self.effective_properties(&dep_root, manifest.constraint_for(&dep_root));
            deps.push(Dependency {
                depender: atom.clone(),
                ident: props.identifier_for(dep_root),
                constraint: props.constraint,
                packages: dep_packages,
            });
        }
        Ok(deps)
    }

    /// Folds every constraint currently on `root` into one, through the
    /// bridge.
    pub(crate) fn composite_constraint(&self, root: &ProjectRoot) -> Result<Constraint, Error> {
        let mut composed = Constraint::Any;
        for dep in self.sel.deps_on(root) {
            composed = self.bridge.intersect(&dep.ident, &composed, &dep.constraint)?;
        }
        Ok(composed)
    }

    pub(crate) fn bridge(&self) -> &SolveBridge {
        &self.bridge
    }

    /// Builds the solution from the selection stack.
    fn finish(&self, digest: InputsDigest) -> Result<Solution, Error> {
        let mut projects = Vec::new();
        for selected in self.sel.projects() {
            if !selected.first || selected.atom.ident.root() == self.root_atom.ident.root() {
                continue;
            }
            let atom = &selected.atom;
            let revision = atom.version.underlying().cloned().ok_or_else(|| {
                Error::Internal(format!("selected {atom} has no known revision"))
            })?;
            let packages: Vec<String> = self
                .sel
                .selected_packages_of(atom.ident.root())
                .into_iter()
                .collect();
            projects.push(LockedProject::new(
                atom.ident.clone(),
                atom.version.unpaired().cloned(),
                revision,
                packages,
            ));
        }
        self.trace(format_args!(
            "solved: {} projects in {} attempts",
            projects.len(),
            self.attempts
        ));
        Ok(Solution::new(digest, projects, self.attempts))
    }

    /// Emits one step-log line when tracing is enabled.
    fn trace(&self, message: std::fmt::Arguments) {
        if !self.params.trace {
            return;
        }
        debug!("{:depth$}{message}", "", depth = self.sel.depth());
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("root", &self.root_atom.ident)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}
