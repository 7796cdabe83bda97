//! The satisfiability checks of a candidate atom.

use std::collections::BTreeMap;

use verdep_tree::TreeEntry;
use verdep_types::{Constraint, Version};

use crate::{
    Error,
    SolveFailure,
    solver::Solver,
    types::{Atom, Dependency},
};

impl Solver {
    /// Decides whether selecting `atom` with the given required packages
    /// keeps the solve consistent.
    ///
    /// The outer result carries hard errors (source layer,
    /// cancellation); the inner result carries the structured failure
    /// that rejects the candidate. Every failure marks the version
    /// queues of the ancestors it blames before it is returned.
    pub(crate) fn satisfiable(
        &mut self,
        atom: &Atom,
        packages: &[String],
    ) -> Result<Result<(), SolveFailure>, Error> {
        if let Err(failure) = self.check_version_allowed(atom)? {
            return Ok(Err(failure));
        }
        if let Err(failure) = self.check_required_packages(atom, packages)? {
            return Ok(Err(failure));
        }
        let deps = self.dependencies_of(atom, packages)?;
        for dep in &deps {
            if let Err(failure) = self.check_source_consistency(dep)? {
                return Ok(Err(failure));
            }
            if let Err(failure) = self.check_revision_exists(dep)? {
                return Ok(Err(failure));
            }
            if let Err(failure) = self.check_constraint_overlap(dep)? {
                return Ok(Err(failure));
            }
            if let Err(failure) = self.check_selected_target(dep)? {
                return Ok(Err(failure));
            }
        }
        Ok(Ok(()))
    }

    /// The atom's version must match the intersection of every constraint
    /// on its project. Blames each depender whose constraint rejects it.
    fn check_version_allowed(
        &mut self,
        atom: &Atom,
    ) -> Result<Result<(), SolveFailure>, Error> {
        let constraint = self.composite_constraint(atom.ident.root())?;
        if self.bridge().matches(&atom.ident, &constraint, &atom.version)? {
            return Ok(Ok(()));
        }
        let deps: Vec<Dependency> = self.sel.deps_on(atom.ident.root()).to_vec();
        let mut failed_deps = Vec::new();
        for dep in deps {
            if !self
                .bridge()
                .matches(&atom.ident, &dep.constraint, &atom.version)?
            {
                self.fail_project(dep.depender.ident.root());
                failed_deps.push(dep);
            }
        }
        Ok(Err(SolveFailure::VersionNotAllowed {
            atom: atom.clone(),
            failed_deps,
            constraint,
        }))
    }

    /// Every required package must exist as a non-error entry in the
    /// atom's package tree. Blames each depender that requested a missing
    /// or broken package.
    fn check_required_packages(
        &mut self,
        atom: &Atom,
        packages: &[String],
    ) -> Result<Result<(), SolveFailure>, Error> {
        let tree = self.bridge().list_packages(&atom.ident, &atom.version)?;
        let mut failures = BTreeMap::new();
        for package in packages {
            let cause = match tree.entry(package) {
                Some(TreeEntry::Package(_)) => continue,
                Some(TreeEntry::Error(error)) => Some(error.clone()),
                None => None,
            };
            let dependers: Vec<Atom> = self
                .sel
                .deps_on(atom.ident.root())
                .iter()
                .filter(|dep| dep.packages.contains(package))
                .map(|dep| dep.depender.clone())
                .collect();
            for depender in &dependers {
                self.fail_project(depender.ident.root());
            }
            failures.insert(package.clone(), (cause, dependers));
        }
        if failures.is_empty() {
            Ok(Ok(()))
        } else {
            Ok(Err(SolveFailure::CheckeeHasProblemPackages {
                atom: atom.clone(),
                failures,
            }))
        }
    }

    /// A dependency naming a source must agree with the source already in
    /// force for its target. Blames every existing depender on the
    /// target.
    fn check_source_consistency(
        &mut self,
        dep: &Dependency,
    ) -> Result<Result<(), SolveFailure>, Error> {
        let Some(added) = dep.ident.source() else {
            return Ok(Ok(()));
        };
        let Some(current) = self.sel.source_in_force(dep.ident.root()) else {
            return Ok(Ok(()));
        };
        if current == added {
            return Ok(Ok(()));
        }
        let current = current.to_string();
        let added = added.to_string();
        let dependers = self.sel.dependers_of(dep.ident.root());
        for depender in &dependers {
            self.fail_project(depender.ident.root());
        }
        Ok(Err(SolveFailure::SourceMismatch {
            root: dep.ident.root().clone(),
            current,
            added,
            dependers,
        }))
    }

    /// A dependency pinning a bare revision requires that revision to
    /// exist in its target's source.
    fn check_revision_exists(
        &mut self,
        dep: &Dependency,
    ) -> Result<Result<(), SolveFailure>, Error> {
        let Constraint::Version(Version::Revision(revision)) = &dep.constraint else {
            return Ok(Ok(()));
        };
        if self.bridge().revision_present(&dep.ident, revision)? {
            return Ok(Ok(()));
        }
        Ok(Err(SolveFailure::NonexistentRevision {
            dependency: dep.clone(),
            revision: revision.clone(),
        }))
    }

    /// A new constraint must intersect the composite constraint already
    /// on its target. Blames the siblings that are individually disjoint
    /// from it.
    fn check_constraint_overlap(
        &mut self,
        dep: &Dependency,
    ) -> Result<Result<(), SolveFailure>, Error> {
        let composite = self.composite_constraint(dep.ident.root())?;
        if self
            .bridge()
            .matches_any(&dep.ident, &composite, &dep.constraint)?
        {
            return Ok(Ok(()));
        }
        let siblings: Vec<Dependency> = self.sel.deps_on(dep.ident.root()).to_vec();
        let mut failing = Vec::new();
        let mut nonfailing = Vec::new();
        for sibling in siblings {
            if !self
                .bridge()
                .matches_any(&dep.ident, &sibling.constraint, &dep.constraint)?
            {
                self.fail_project(sibling.depender.ident.root());
                failing.push(sibling);
            } else {
                nonfailing.push(sibling);
            }
        }
        Ok(Err(SolveFailure::DisjointConstraint {
            dependency: dep.clone(),
            failing,
            nonfailing,
        }))
    }

    /// An already-selected target must satisfy the new constraint and
    /// provide the packages the new dependency requires of it. Blames the
    /// target.
    fn check_selected_target(
        &mut self,
        dep: &Dependency,
    ) -> Result<Result<(), SolveFailure>, Error> {
        let Some(selected) = self.sel.selected_atom(dep.ident.root()).cloned() else {
            return Ok(Ok(()));
        };
        if !self
            .bridge()
            .matches(&dep.ident, &dep.constraint, &selected.version)?
        {
            self.fail_project(dep.ident.root());
            return Ok(Err(SolveFailure::ConstraintNotAllowed {
                dependency: dep.clone(),
                selected: selected.version,
            }));
        }

        let tree = self
            .bridge()
            .list_packages(&selected.ident, &selected.version)?;
        let mut problems = BTreeMap::new();
        for package in &dep.packages {
            match tree.entry(package) {
                Some(TreeEntry::Package(_)) => {}
                Some(TreeEntry::Error(error)) => {
                    problems.insert(package.clone(), Some(error.clone()));
                }
                None => {
                    problems.insert(package.clone(), None);
                }
            }
        }
        if problems.is_empty() {
            return Ok(Ok(()));
        }
        self.fail_project(dep.ident.root());
        Ok(Err(SolveFailure::DepHasProblemPackages {
            dependency: dep.clone(),
            problems,
        }))
    }
}
