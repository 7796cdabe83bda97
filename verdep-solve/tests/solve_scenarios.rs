//! Integration tests for `verdep-solve` against an in-memory source
//! gateway.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
    sync::Arc,
};

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::{TempDir, tempdir};
use testresult::TestResult;
use verdep_solve::{Error, SolveFailure, SolveParameters, Solution, Solver};
use verdep_source::{
    AnalyzerInfo,
    CancelToken,
    Error as SourceError,
    ManifestAnalyzer,
    SourceGateway,
    SourceManager,
};
use verdep_tree::{Package, PackageTree, TreeEntry};
use verdep_types::{
    Constraint,
    InputsDigest,
    Lock,
    LockedProject,
    Manifest,
    PairedVersion,
    ProjectIdentifier,
    ProjectProperties,
    ProjectRoot,
    Revision,
    UnpairedVersion,
    Version,
};

/// One available version of one project in the test universe.
struct FixtureVersion {
    paired: PairedVersion,
    manifest: Manifest,
    tree: PackageTree,
}

/// An in-memory gateway over a fixed universe of projects.
#[derive(Default)]
struct FixtureGateway {
    projects: HashMap<String, Vec<FixtureVersion>>,
}

impl FixtureGateway {
    fn new() -> Self {
        Self::default()
    }

    /// Adds one version of a project.
    ///
    /// `packages` maps a sub path (empty for the project root itself) to
    /// the imports of the package there. `constraints` declares the
    /// project's manifest entries as `(root, constraint, source)`.
    fn add(
        &mut self,
        root: &str,
        version: &str,
        packages: &[(&str, &[&str])],
        constraints: &[(&str, &str, Option<&str>)],
    ) {
        let revision = Revision::new(format!("rev-{}-{version}", root.replace('/', "-")))
            .expect("revision is non-empty");
        let paired = UnpairedVersion::tag(version).pair(revision);

        let mut tree = PackageTree::new(root);
        for (sub, imports) in packages {
            let path = if sub.is_empty() {
                root.to_string()
            } else {
                format!("{root}/{sub}")
            };
            let name = path.rsplit('/').next().unwrap_or(root).to_string();
            tree.insert(
                path,
                TreeEntry::Package(Package::new(name).with_imports(imports.iter().copied())),
            );
        }

        let mut manifest = Manifest::new();
        for (dep_root, constraint, source) in constraints {
            manifest.insert_constraint(
                ProjectRoot::new(*dep_root).expect("valid project root"),
                ProjectProperties {
                    source: source.map(String::from),
                    constraint: constraint.parse().expect("valid constraint"),
                },
            );
        }

        self.projects.entry(root.to_string()).or_default().push(FixtureVersion {
            paired,
            manifest,
            tree,
        });
    }

    fn find(&self, ident: &ProjectIdentifier, version: &Version) -> Result<&FixtureVersion, SourceError> {
        let versions = self.projects.get(ident.root().as_str()).ok_or_else(|| {
            SourceError::SourceUnreachable {
                ident: ident.clone(),
                message: "no such project in the fixture universe".to_string(),
            }
        })?;
        versions
            .iter()
            .find(|candidate| version.matches(&Version::Paired(candidate.paired.clone())))
            .ok_or_else(|| SourceError::UnknownVersion {
                ident: ident.clone(),
                version: version.clone(),
            })
    }
}

impl SourceGateway for FixtureGateway {
    fn source_exists(&self, ident: &ProjectIdentifier, _: &CancelToken) -> Result<bool, SourceError> {
        Ok(self.projects.contains_key(ident.root().as_str()))
    }

    fn sync_source(&self, _: &ProjectIdentifier, _: &CancelToken) -> Result<(), SourceError> {
        Ok(())
    }

    fn list_versions(
        &self,
        ident: &ProjectIdentifier,
        _: &CancelToken,
    ) -> Result<Vec<PairedVersion>, SourceError> {
        let versions = self.projects.get(ident.root().as_str()).ok_or_else(|| {
            SourceError::SourceUnreachable {
                ident: ident.clone(),
                message: "no such project in the fixture universe".to_string(),
            }
        })?;
        Ok(versions.iter().map(|candidate| candidate.paired.clone()).collect())
    }

    fn revision_present_in(
        &self,
        ident: &ProjectIdentifier,
        revision: &Revision,
        _: &CancelToken,
    ) -> Result<bool, SourceError> {
        Ok(self
            .projects
            .get(ident.root().as_str())
            .is_some_and(|versions| {
                versions
                    .iter()
                    .any(|candidate| candidate.paired.revision() == revision)
            }))
    }

    fn list_packages_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        _: &CancelToken,
    ) -> Result<PackageTree, SourceError> {
        Ok(self.find(ident, version)?.tree.clone())
    }

    fn manifest_and_lock_at(
        &self,
        ident: &ProjectIdentifier,
        version: &Version,
        _: &dyn ManifestAnalyzer,
        _: &CancelToken,
    ) -> Result<(Manifest, Option<Lock>), SourceError> {
        Ok((self.find(ident, version)?.manifest.clone(), None))
    }

    fn export_at(
        &self,
        _: &ProjectIdentifier,
        _: &Version,
        _: &Path,
        _: &CancelToken,
    ) -> Result<(), SourceError> {
        Ok(())
    }

    fn deduce_project_root(
        &self,
        import_path: &str,
        _: &CancelToken,
    ) -> Result<ProjectRoot, SourceError> {
        self.projects
            .keys()
            .filter(|root| {
                import_path == root.as_str()
                    || (import_path.starts_with(root.as_str())
                        && import_path[root.len()..].starts_with('/'))
            })
            .max_by_key(|root| root.len())
            .map(|root| ProjectRoot::new(root.clone()).expect("valid project root"))
            .ok_or_else(|| SourceError::DeductionFailure {
                import_path: import_path.to_string(),
                message: "no fixture project covers this path".to_string(),
            })
    }
}

struct FixtureAnalyzer;

impl ManifestAnalyzer for FixtureAnalyzer {
    fn derive_manifest_and_lock(
        &self,
        _: &Path,
        _: &ProjectRoot,
    ) -> Result<(Manifest, Option<Lock>), SourceError> {
        Ok((Manifest::new(), None))
    }

    fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo {
            name: "fixture-analyzer".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// A fully wired solve harness over a fixture universe.
struct Harness {
    root_dir: TempDir,
    cache_dir: TempDir,
    gateway: FixtureGateway,
    root_tree: PackageTree,
    manifest: Manifest,
    lock: Option<Lock>,
}

impl Harness {
    fn new() -> TestResult<Self> {
        Ok(Self {
            root_dir: tempdir()?,
            cache_dir: tempdir()?,
            gateway: FixtureGateway::new(),
            root_tree: PackageTree::new("root"),
            manifest: Manifest::new(),
            lock: None,
        })
    }

    /// Declares a root package at `sub` (empty for the root itself).
    fn root_package(&mut self, sub: &str, imports: &[&str]) {
        let path = if sub.is_empty() {
            "root".to_string()
        } else {
            format!("root/{sub}")
        };
        let name = path.rsplit('/').next().unwrap_or("root").to_string();
        self.root_tree.insert(
            path,
            TreeEntry::Package(Package::new(name).with_imports(imports.iter().copied())),
        );
    }

    fn constrain(&mut self, root: &str, constraint: &str) {
        self.manifest.insert_constraint(
            ProjectRoot::new(root).expect("valid project root"),
            ProjectProperties::from_constraint(constraint.parse().expect("valid constraint")),
        );
    }

    fn params(&self) -> SolveParameters {
        let mut params = SolveParameters::new(
            self.root_dir.path(),
            Arc::new(self.root_tree.clone()),
            self.manifest.clone(),
        );
        params.lock = self.lock.clone();
        // The fixture universe uses short project roots; nothing is
        // standard library.
        params.stdlib = Some(Arc::new(|_: &str| false));
        params
    }

    fn prepare(&mut self, params: SolveParameters) -> Result<Solver, Error> {
        let mut gateway = FixtureGateway::new();
        std::mem::swap(&mut gateway, &mut self.gateway);
        let manager = Arc::new(
            SourceManager::new(
                self.cache_dir.path().join("cache"),
                Arc::new(gateway),
                true,
            )
            .expect("cache directory is lockable"),
        );
        Solver::prepare(params, manager, Arc::new(FixtureAnalyzer), CancelToken::new())
    }

    fn solve(&mut self) -> Result<Solution, Error> {
        let params = self.params();
        self.prepare(params)?.solve()
    }
}

fn locked_version(solution: &Solution, root: &str) -> String {
    solution
        .projects()
        .iter()
        .find(|project| project.ident().root().as_str() == root)
        .and_then(|project| project.version())
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[rstest]
fn shared_dependency_with_overlapping_constraints() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a", "b"]);
    harness.constrain("a", ">=1.0.0");
    harness.constrain("b", ">=1.0.0");
    harness.gateway.add("a", "1.0.0", &[("", &["b"])], &[("b", "1.0.0", None)]);
    harness.gateway.add("b", "1.0.0", &[("", &[])], &[]);
    harness.gateway.add("b", "1.1.0", &[("", &[])], &[]);

    let solution = harness.solve()?;
    assert_eq!(locked_version(&solution, "a"), "1.0.0");
    assert_eq!(locked_version(&solution, "b"), "1.0.0");
    assert_eq!(solution.projects().len(), 2);
    Ok(())
}

#[rstest]
fn digest_feed_is_canonical() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a", "b"]);
    harness.constrain("a", ">=1.0.0");
    harness.constrain("b", ">=1.0.0");
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);
    harness.gateway.add("b", "1.0.0", &[("", &[])], &[]);

    let root_dir = harness.root_dir.path().display().to_string();
    let params = harness.params();
    let solver = harness.prepare(params)?;
    let feed = solver.digest_feed();
    assert_eq!(
        feed,
        [
            "a".to_string(),
            ">=1.0.0".to_string(),
            "b".to_string(),
            ">=1.0.0".to_string(),
            root_dir,
            "fixture-analyzer".to_string(),
            "1.0.0".to_string(),
        ]
    );
    Ok(())
}

#[rstest]
fn digest_reacts_to_inputs_and_nothing_else() -> TestResult {
    // The digest covers the root directory string, so every variant has
    // to solve against the same path.
    let fixed_root = std::env::temp_dir().join("verdep-digest-fixture");
    std::fs::create_dir_all(&fixed_root)?;
    let build = |extra_ignore: &[&str]| -> TestResult<InputsDigest> {
        let mut harness = Harness::new()?;
        harness.root_package("", &["a"]);
        harness.constrain("a", ">=1.0.0");
        harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);
        let mut params = harness.params();
        params.root_dir = fixed_root.clone();
        params.ignore = extra_ignore.iter().map(ToString::to_string).collect();
        let solver = harness.prepare(params)?;
        Ok(solver.hash_inputs())
    };

    let base = build(&[])?;
    assert_eq!(base, build(&[])?);
    // The ignore set is order-insensitive by construction.
    assert_eq!(build(&["x/*", "y"])?, build(&["y", "x/*"])?);
    assert_ne!(base, build(&["x/*"])?);
    Ok(())
}

#[rstest]
fn backtracks_off_a_version_on_late_discovered_import() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["root/foo"]);
    harness.root_package("foo", &["a", "b"]);
    harness.gateway.add("a", "1.0.0", &[("", &["c"])], &[]);
    harness.gateway.add("a", "1.1.0", &[("", &[])], &[]);
    harness.gateway.add("b", "0.9.0", &[("", &["c"])], &[]);
    harness.gateway.add("b", "1.0.0", &[("", &["c"])], &[]);
    harness.gateway.add("c", "1.0.0", &[("", &["a"])], &[("a", "1.0.0", None)]);

    let solution = harness.solve()?;
    assert_eq!(locked_version(&solution, "a"), "1.0.0");
    assert_eq!(locked_version(&solution, "b"), "1.0.0");
    assert_eq!(locked_version(&solution, "c"), "1.0.0");
    Ok(())
}

#[rstest]
fn declared_constraint_without_import_yields_empty_solution() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &[]);
    harness.constrain("a", "1.0.0");
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);

    let solution = harness.solve()?;
    assert!(solution.projects().is_empty());
    Ok(())
}

#[rstest]
fn disjoint_constraints_blame_both_dependers() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a", "b"]);
    harness.gateway.add("a", "1.0.0", &[("", &["c"])], &[("c", "1.0.0", None)]);
    harness.gateway.add("b", "1.0.0", &[("", &["c"])], &[("c", "2.0.0", None)]);
    harness.gateway.add("c", "1.0.0", &[("", &[])], &[]);
    harness.gateway.add("c", "2.0.0", &[("", &[])], &[]);

    let error = harness.solve().expect_err("constraints are disjoint");
    let (ident, causes) = match error {
        Error::Solve(SolveFailure::NoVersionMatching { ident, causes }) => (ident, causes),
        other => panic!("expected an aggregated version failure, got {other}"),
    };
    assert_eq!(ident.root().as_str(), "b");
    let Some((_, SolveFailure::DisjointConstraint { dependency, failing, .. })) = causes.first()
    else {
        panic!("expected a disjoint-constraint cause");
    };
    assert_eq!(dependency.depender.ident.root().as_str(), "b");
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].depender.ident.root().as_str(), "a");
    Ok(())
}

#[rstest]
fn lock_preservation_tries_the_locked_version_first() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a"]);
    harness.constrain("a", ">=1.0.0");
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);
    harness.gateway.add("a", "1.0.1", &[("", &[])], &[]);
    harness.gateway.add("a", "1.0.2", &[("", &[])], &[]);
    harness.lock = Some(Lock::new(
        InputsDigest::new([0; 32]),
        vec![LockedProject::new(
            ProjectIdentifier::from(ProjectRoot::new("a")?),
            Some(UnpairedVersion::semver("1.0.1")?),
            Revision::new("rev-a-1.0.1")?,
            vec!["a".to_string()],
        )],
    ));

    let solution = harness.solve()?;
    assert_eq!(locked_version(&solution, "a"), "1.0.1");
    assert_eq!(
        solution.projects()[0].revision(),
        &Revision::new("rev-a-1.0.1")?
    );
    Ok(())
}

#[rstest]
fn change_all_ignores_the_lock() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a"]);
    harness.constrain("a", ">=1.0.0");
    harness.gateway.add("a", "1.0.1", &[("", &[])], &[]);
    harness.gateway.add("a", "1.0.2", &[("", &[])], &[]);
    harness.lock = Some(Lock::new(
        InputsDigest::new([0; 32]),
        vec![LockedProject::new(
            ProjectIdentifier::from(ProjectRoot::new("a")?),
            Some(UnpairedVersion::semver("1.0.1")?),
            Revision::new("rev-a-1.0.1")?,
            vec!["a".to_string()],
        )],
    ));

    let mut params = harness.params();
    params.change_all = true;
    let solution = harness.prepare(params)?.solve()?;
    assert_eq!(locked_version(&solution, "a"), "1.0.2");
    Ok(())
}

#[rstest]
fn full_releases_are_preferred_over_higher_prereleases() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a"]);
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);
    harness.gateway.add("a", "1.1.0-alpha", &[("", &[])], &[]);

    let solution = harness.solve()?;
    assert_eq!(locked_version(&solution, "a"), "1.0.0");
    Ok(())
}

#[rstest]
fn branch_constraints_match_through_revisions() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a"]);
    // The tag and the branch share a revision in the fixture universe.
    let revision = Revision::new("shared-revision")?;
    harness.gateway.projects.entry("a".to_string()).or_default().push(FixtureVersion {
        paired: UnpairedVersion::tag("1.0.0").pair(revision.clone()),
        manifest: Manifest::new(),
        tree: {
            let mut tree = PackageTree::new("a");
            tree.insert("a".to_string(), TreeEntry::Package(Package::new("a")));
            tree
        },
    });
    harness.gateway.projects.entry("a".to_string()).or_default().push(FixtureVersion {
        paired: UnpairedVersion::branch("main").pair(revision.clone()),
        manifest: Manifest::new(),
        tree: {
            let mut tree = PackageTree::new("a");
            tree.insert("a".to_string(), TreeEntry::Package(Package::new("a")));
            tree
        },
    });
    harness.manifest.insert_constraint(
        ProjectRoot::new("a")?,
        ProjectProperties::from_constraint(Constraint::Version(Version::Unpaired(
            UnpairedVersion::branch("main"),
        ))),
    );

    let solution = harness.solve()?;
    // The semver tag sorts first; the branch constraint admits it
    // because they resolve to the same revision.
    assert_eq!(locked_version(&solution, "a"), "1.0.0");
    assert_eq!(solution.projects()[0].revision(), &revision);
    Ok(())
}

#[rstest]
fn conflicting_sources_for_one_root_fail() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a", "b"]);
    harness.gateway.add(
        "a",
        "1.0.0",
        &[("", &["c"])],
        &[("c", "*", Some("mirror.example/c"))],
    );
    harness.gateway.add(
        "b",
        "1.0.0",
        &[("", &["c"])],
        &[("c", "*", Some("other.example/c"))],
    );
    harness.gateway.add("c", "1.0.0", &[("", &[])], &[]);

    let error = harness.solve().expect_err("sources conflict");
    let causes = match error {
        Error::Solve(SolveFailure::NoVersionMatching { causes, .. }) => causes,
        other => panic!("expected an aggregated version failure, got {other}"),
    };
    assert!(matches!(
        causes.first(),
        Some((_, SolveFailure::SourceMismatch { .. }))
    ));
    Ok(())
}

#[rstest]
fn missing_required_package_is_blamed_on_the_candidate() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a/sub"]);
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);

    let error = harness.solve().expect_err("the package does not exist");
    let (ident, causes) = match error {
        Error::Solve(SolveFailure::NoVersionMatching { ident, causes }) => (ident, causes),
        other => panic!("expected an aggregated version failure, got {other}"),
    };
    assert_eq!(ident.root().as_str(), "a");
    let Some((_, SolveFailure::CheckeeHasProblemPackages { failures, .. })) = causes.first()
    else {
        panic!("expected a problem-package cause");
    };
    assert!(failures.contains_key("a/sub"));
    Ok(())
}

#[rstest]
fn ignored_imports_do_not_participate() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a", "gen.example/x"]);
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);
    harness.manifest.insert_ignored("gen.example/*");

    let solution = harness.solve()?;
    assert_eq!(solution.projects().len(), 1);
    assert_eq!(locked_version(&solution, "a"), "1.0.0");
    Ok(())
}

#[rstest]
fn bad_options_surface_at_prepare_time() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &[]);

    let mut params = harness.params();
    params.root_dir = "/does/not/exist".into();
    assert!(matches!(harness.prepare(params), Err(Error::BadOptions(_))));

    let mut harness = Harness::new()?;
    harness.root_package("", &[]);
    harness.manifest.insert_required("a");
    harness.manifest.insert_ignored("a");
    let params = harness.params();
    assert!(matches!(harness.prepare(params), Err(Error::BadOptions(_))));
    Ok(())
}

#[rstest]
fn cancellation_aborts_the_solve() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["a"]);
    harness.gateway.add("a", "1.0.0", &[("", &[])], &[]);

    let params = harness.params();
    let mut gateway = FixtureGateway::new();
    std::mem::swap(&mut gateway, &mut harness.gateway);
    let manager = Arc::new(SourceManager::new(
        harness.cache_dir.path().join("cache"),
        Arc::new(gateway),
        true,
    )?);
    let cancel = CancelToken::new();
    let solver = Solver::prepare(params, manager, Arc::new(FixtureAnalyzer), cancel.clone())?;
    cancel.cancel();
    let error = solver.solve().expect_err("the token fired");
    assert!(matches!(error, Error::Source(SourceError::Canceled)));
    Ok(())
}

#[rstest]
fn solution_round_trips_through_the_lock_format() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["root/foo"]);
    harness.root_package("foo", &["a", "b"]);
    harness.gateway.add("a", "1.0.0", &[("", &["c"])], &[]);
    harness.gateway.add("a", "1.1.0", &[("", &[])], &[]);
    harness.gateway.add("b", "0.9.0", &[("", &["c"])], &[]);
    harness.gateway.add("b", "1.0.0", &[("", &["c"])], &[]);
    harness.gateway.add("c", "1.0.0", &[("", &["a"])], &[("a", "1.0.0", None)]);

    let solution = harness.solve()?;
    let lock = solution.to_lock();
    let encoded = serde_json::to_string_pretty(&lock)?;
    let decoded: Lock = serde_json::from_str(&encoded)?;
    assert_eq!(lock, decoded);
    Ok(())
}

#[rstest]
fn solved_packages_exist_at_their_locked_versions() -> TestResult {
    let mut harness = Harness::new()?;
    harness.root_package("", &["root/foo"]);
    harness.root_package("foo", &["a", "b"]);
    harness.gateway.add("a", "1.0.0", &[("", &["c"]), ("extra", &[])], &[]);
    harness.gateway.add("b", "1.0.0", &[("", &["c", "a/extra"])], &[]);
    harness.gateway.add("c", "1.0.0", &[("", &[])], &[]);

    // Keep a copy of the universe to verify against after the solve.
    let trees: HashMap<(String, String), PackageTree> = harness
        .gateway
        .projects
        .iter()
        .flat_map(|(root, versions)| {
            versions.iter().map(|candidate| {
                (
                    (root.clone(), candidate.paired.unpaired().to_string()),
                    candidate.tree.clone(),
                )
            })
        })
        .collect();

    let solution = harness.solve()?;
    for project in solution.projects() {
        let version = project.version().expect("fixture versions are tagged");
        let tree = &trees[&(project.ident().root().to_string(), version.to_string())];
        for package in project.packages() {
            assert!(
                tree.package(package).is_some(),
                "{package} must be a non-error entry of {} at {version}",
                project.ident()
            );
        }
    }
    // The shared package demand from b was absorbed into a's selection.
    let a = solution
        .projects()
        .iter()
        .find(|project| project.ident().root().as_str() == "a")
        .expect("a is in the solution");
    assert_eq!(a.packages(), ["a", "a/extra"]);
    Ok(())
}

#[rstest]
fn attempts_are_deterministic() -> TestResult {
    let run = || -> TestResult<u64> {
        let mut harness = Harness::new()?;
        harness.root_package("", &["root/foo"]);
        harness.root_package("foo", &["a", "b"]);
        harness.gateway.add("a", "1.0.0", &[("", &["c"])], &[]);
        harness.gateway.add("a", "1.1.0", &[("", &[])], &[]);
        harness.gateway.add("b", "0.9.0", &[("", &["c"])], &[]);
        harness.gateway.add("b", "1.0.0", &[("", &["c"])], &[]);
        harness.gateway.add("c", "1.0.0", &[("", &["a"])], &[("a", "1.0.0", None)]);
        Ok(harness.solve()?.attempts())
    };
    assert_eq!(run()?, run()?);
    Ok(())
}
