//! The in-memory manifest shape.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Constraint, ProjectIdentifier, ProjectRoot};

/// The declared properties of one required project.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectProperties {
    /// The upstream location to fetch the project from instead of the
    /// location its root deduces to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// The constraint the project's version must satisfy.
    pub constraint: Constraint,
}

impl ProjectProperties {
    /// Creates properties carrying only a constraint.
    pub fn from_constraint(constraint: Constraint) -> Self {
        Self {
            source: None,
            constraint,
        }
    }

    /// Returns the identifier these properties select for `root`.
    pub fn identifier_for(&self, root: ProjectRoot) -> ProjectIdentifier {
        ProjectIdentifier::new(root, self.source.clone())
    }
}

/// A project's declared dependency requirements.
///
/// Constraints only apply to projects that are actually imported (or listed
/// in `required`); a constraint on an unimported project has no effect on a
/// solve. Overrides are honored only when the manifest is the root's and
/// replace the source and/or constraint of every dependency on the
/// overridden root, from any depender.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Per-project version requirements.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    constraints: BTreeMap<ProjectRoot, ProjectProperties>,
    /// Root-only replacements for dependencies anywhere in the graph.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    overrides: BTreeMap<ProjectRoot, ProjectProperties>,
    /// Import paths to solve for even when nothing imports them.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    required: BTreeSet<String>,
    /// Import path patterns excised from reach computation. A trailing `*`
    /// matches by prefix.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    ignored: BTreeSet<String>,
}

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a constraint on a project.
    pub fn insert_constraint(&mut self, root: ProjectRoot, properties: ProjectProperties) {
        self.constraints.insert(root, properties);
    }

    /// Declares an override of a project's source and/or constraint.
    pub fn insert_override(&mut self, root: ProjectRoot, properties: ProjectProperties) {
        self.overrides.insert(root, properties);
    }

    /// Adds an import path that must be solved for.
    pub fn insert_required(&mut self, import_path: impl Into<String>) {
        self.required.insert(import_path.into());
    }

    /// Adds an ignore pattern.
    pub fn insert_ignored(&mut self, pattern: impl Into<String>) {
        self.ignored.insert(pattern.into());
    }

    /// Returns the declared per-project constraints.
    pub fn constraints(&self) -> &BTreeMap<ProjectRoot, ProjectProperties> {
        &self.constraints
    }

    /// Returns the declared overrides.
    pub fn overrides(&self) -> &BTreeMap<ProjectRoot, ProjectProperties> {
        &self.overrides
    }

    /// Returns the declared properties for `root`, if any.
    pub fn constraint_for(&self, root: &ProjectRoot) -> Option<&ProjectProperties> {
        self.constraints.get(root)
    }

    /// Returns the required import paths.
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Returns the ignore patterns.
    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }
}
