//! Error handling and the structured failure taxonomy of the solver.

use std::collections::BTreeMap;

use thiserror::Error;
use verdep_tree::PackageError;
use verdep_types::{Constraint, ProjectIdentifier, ProjectRoot, Revision, Version};

use crate::types::{Atom, Dependency};

/// The error a solve can end with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The solve parameters are invalid. Surfaced at prepare time.
    #[error("invalid solve parameters: {0}")]
    BadOptions(String),

    /// A source layer failure, including unreachable upstreams and
    /// cancellation. These surface immediately instead of being recorded
    /// against a version.
    #[error(transparent)]
    Source(#[from] verdep_source::Error),

    /// No assignment of versions satisfies the inputs.
    #[error(transparent)]
    Solve(#[from] SolveFailure),

    /// An internal invariant was violated. This is a bug in the solver.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Why a candidate version (or a whole solve) was rejected.
///
/// Every variant carries the dependencies or dependers to blame, so a
/// front end can render actionable reports. Failures accumulate on the
/// version queue of the project they occurred for and only surface once
/// the queue exhausts.
#[derive(Clone, Debug, Error, strum::IntoStaticStr)]
#[non_exhaustive]
pub enum SolveFailure {
    /// Every candidate version of a project was rejected.
    #[error("{}", render_no_version(.ident, .causes))]
    NoVersionMatching {
        /// The project that ran out of candidates.
        ident: ProjectIdentifier,
        /// Each rejected version with the failure that rejected it.
        causes: Vec<(Version, SolveFailure)>,
    },

    /// A candidate's version is rejected by constraints already in force.
    #[error("{}", render_version_not_allowed(.atom, .failed_deps, .constraint))]
    VersionNotAllowed {
        /// The rejected atom.
        atom: Atom,
        /// The dependencies whose constraints reject the atom.
        failed_deps: Vec<Dependency>,
        /// The composed constraint in force for the project.
        constraint: Constraint,
    },

    /// A new dependency's constraint has an empty intersection with
    /// constraints already in force.
    #[error("{}", render_disjoint(.dependency, .failing))]
    DisjointConstraint {
        /// The newly introduced dependency.
        dependency: Dependency,
        /// Sibling dependencies individually disjoint from the new one.
        failing: Vec<Dependency>,
        /// Sibling dependencies that do intersect the new one.
        nonfailing: Vec<Dependency>,
    },

    /// A new dependency's constraint does not admit the already-selected
    /// version of its target.
    #[error("{dependency} does not allow the selected version {selected}")]
    ConstraintNotAllowed {
        /// The newly introduced dependency.
        dependency: Dependency,
        /// The version its target is already selected at.
        selected: Version,
    },

    /// Two dependers name the same project root with different sources.
    #[error("{}", render_source_mismatch(.root, .current, .added, .dependers))]
    SourceMismatch {
        /// The shared project root.
        root: ProjectRoot,
        /// The source already in force.
        current: String,
        /// The conflicting source that was added.
        added: String,
        /// The dependers on the root so far.
        dependers: Vec<Atom>,
    },

    /// A candidate is missing required packages or has them as errors.
    #[error("{}", render_problem_packages(.atom, .failures))]
    CheckeeHasProblemPackages {
        /// The candidate atom.
        atom: Atom,
        /// Per missing or broken package: its cause (`None` when the
        /// package does not exist at all) and the dependers requiring it.
        failures: BTreeMap<String, (Option<PackageError>, Vec<Atom>)>,
    },

    /// A new dependency requires packages its already-selected target
    /// does not provide.
    #[error("{}", render_dep_problem_packages(.dependency, .problems))]
    DepHasProblemPackages {
        /// The newly introduced dependency.
        dependency: Dependency,
        /// Per missing or broken package: its cause (`None` when the
        /// package does not exist at all).
        problems: BTreeMap<String, Option<PackageError>>,
    },

    /// A dependency pins a revision that does not exist in its target.
    #[error("{dependency} pins revision {revision}, which does not exist")]
    NonexistentRevision {
        /// The dependency pinning the revision.
        dependency: Dependency,
        /// The missing revision.
        revision: Revision,
    },
}

impl SolveFailure {
    /// Returns the failure's kind as a stable identifier, for trace
    /// output.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

fn render_no_version(ident: &ProjectIdentifier, causes: &[(Version, SolveFailure)]) -> String {
    use std::fmt::Write;

    let mut out = format!("no version of {ident} satisfied all constraints");
    for (version, cause) in causes {
        let _ = write!(out, "\n  {version}: {cause}");
    }
    out
}

fn render_version_not_allowed(
    atom: &Atom,
    failed_deps: &[Dependency],
    constraint: &Constraint,
) -> String {
    use std::fmt::Write;

    let mut out = format!("{atom} is not allowed by the composed constraint {constraint}:");
    for dep in failed_deps {
        let _ = write!(out, "\n  {} requires {}", dep.depender, dep.constraint);
    }
    out
}

fn render_disjoint(dependency: &Dependency, failing: &[Dependency]) -> String {
    use std::fmt::Write;

    let mut out = format!("no version can satisfy {dependency}:");
    for dep in failing {
        let _ = write!(
            out,
            "\n  {} requires {}, which is disjoint",
            dep.depender, dep.constraint
        );
    }
    out
}

fn render_source_mismatch(
    root: &ProjectRoot,
    current: &str,
    added: &str,
    dependers: &[Atom],
) -> String {
    use std::fmt::Write;

    let mut out =
        format!("{root} is wanted from source {added}, but source {current} is already in force");
    for depender in dependers {
        let _ = write!(out, "\n  depended on by {depender}");
    }
    out
}

fn render_problem_packages(
    atom: &Atom,
    failures: &BTreeMap<String, (Option<PackageError>, Vec<Atom>)>,
) -> String {
    use std::fmt::Write;

    let mut out = format!("{atom} is missing required packages:");
    for (package, (cause, dependers)) in failures {
        match cause {
            Some(cause) => {
                let _ = write!(out, "\n  {package} is not usable: {cause}");
            }
            None => {
                let _ = write!(out, "\n  {package} does not exist");
            }
        }
        for depender in dependers {
            let _ = write!(out, " (required by {depender})");
        }
    }
    out
}

fn render_dep_problem_packages(
    dependency: &Dependency,
    problems: &BTreeMap<String, Option<PackageError>>,
) -> String {
    use std::fmt::Write;

    let mut out = format!("{dependency} requires packages its selected version lacks:");
    for (package, cause) in problems {
        match cause {
            Some(cause) => {
                let _ = write!(out, "\n  {package} is not usable: {cause}");
            }
            None => {
                let _ = write!(out, "\n  {package} does not exist");
            }
        }
    }
    out
}
