//! The selection stack and dependency bookkeeping.

use std::collections::{BTreeSet, HashMap};

use verdep_types::{ProjectRoot, Version};

use crate::types::{Atom, Dependency};

/// One entry on the selection stack.
///
/// The first selection of a project carries its version choice; later
/// selections of the same project only absorb additional packages.
#[derive(Clone, Debug)]
pub(crate) struct SelectedProject {
    /// The selected atom.
    pub(crate) atom: Atom,
    /// The packages demanded when this selection was made.
    pub(crate) packages: Vec<String>,
    /// Whether this selection brought the project in.
    pub(crate) first: bool,
    /// The dependencies this selection introduced.
    pub(crate) introduced: Vec<Dependency>,
}

/// The ordered selection state of a solve.
///
/// Tracks the stack of selections and, per project root, the list of
/// dependencies currently targeting it. Dependencies are pushed when
/// their depender is selected and popped exactly when it is unselected.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    projects: Vec<SelectedProject>,
    deps: HashMap<ProjectRoot, Vec<Dependency>>,
}

impl Selection {
    /// Creates an empty selection.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the selection stack.
    pub(crate) fn projects(&self) -> &[SelectedProject] {
        &self.projects
    }

    /// Returns the current depth of the stack, for trace output.
    pub(crate) fn depth(&self) -> usize {
        self.projects.len()
    }

    /// Pushes a selection and the dependencies it introduces.
    pub(crate) fn select(&mut self, selected: SelectedProject) {
        for dep in &selected.introduced {
            self.deps
                .entry(dep.ident.root().clone())
                .or_default()
                .push(dep.clone());
        }
        self.projects.push(selected);
    }

    /// Pops the most recent selection, retracting its dependencies.
    pub(crate) fn unselect_last(&mut self) -> Option<SelectedProject> {
        let removed = self.projects.pop()?;
        for dep in &removed.introduced {
            if let Some(deps) = self.deps.get_mut(dep.ident.root()) {
                if let Some(position) = deps.iter().rposition(|existing| existing == dep) {
                    deps.remove(position);
                }
                if deps.is_empty() {
                    self.deps.remove(dep.ident.root());
                }
            }
        }
        Some(removed)
    }

    /// Returns the version a project is selected at, if it is selected.
    pub(crate) fn selected_atom(&self, root: &ProjectRoot) -> Option<&Atom> {
        self.projects
            .iter()
            .find(|selected| selected.first && selected.atom.ident.root() == root)
            .map(|selected| &selected.atom)
    }

    /// Returns the selected version of a project, if any.
    pub(crate) fn selected_version(&self, root: &ProjectRoot) -> Option<&Version> {
        self.selected_atom(root).map(|atom| &atom.version)
    }

    /// Returns the dependencies currently targeting `root`.
    pub(crate) fn deps_on(&self, root: &ProjectRoot) -> &[Dependency] {
        self.deps.get(root).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns how many dependencies currently target `root`.
    pub(crate) fn depender_count(&self, root: &ProjectRoot) -> usize {
        self.deps_on(root).len()
    }

    /// Returns the atoms that currently depend on `root`.
    pub(crate) fn dependers_of(&self, root: &ProjectRoot) -> Vec<Atom> {
        self.deps_on(root)
            .iter()
            .map(|dep| dep.depender.clone())
            .collect()
    }

    /// Returns the union of packages all selections of `root` cover.
    pub(crate) fn selected_packages_of(&self, root: &ProjectRoot) -> BTreeSet<String> {
        self.projects
            .iter()
            .filter(|selected| selected.atom.ident.root() == root)
            .flat_map(|selected| selected.packages.iter().cloned())
            .collect()
    }

    /// Returns the non-empty source already in force for `root`, if any
    /// depender names one.
    pub(crate) fn source_in_force(&self, root: &ProjectRoot) -> Option<&str> {
        self.deps_on(root)
            .iter()
            .find_map(|dep| dep.ident.source())
    }
}
