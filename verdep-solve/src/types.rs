//! Solver vocabulary types.

use std::fmt::{Display, Formatter};

use verdep_types::{Constraint, ProjectIdentifier, Version};

/// A concrete `(identifier, version)` pair considered for selection.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Atom {
    /// The project the atom selects.
    pub ident: ProjectIdentifier,
    /// The version the atom selects it at.
    pub version: Version,
}

impl Atom {
    /// Creates an atom.
    pub fn new(ident: ProjectIdentifier, version: Version) -> Self {
        Self { ident, version }
    }
}

impl Display for Atom {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}@{}", self.ident, self.version)
    }
}

/// One dependency edge discovered during solving: a selected atom
/// requiring packages of another project under a constraint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dependency {
    /// The atom that declares the dependency.
    pub depender: Atom,
    /// The project the dependency targets.
    pub ident: ProjectIdentifier,
    /// The constraint on the target's version.
    pub constraint: Constraint,
    /// The import paths required from the target, sorted.
    pub packages: Vec<String>,
}

impl Display for Dependency {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "{} on {} with {}",
            self.depender, self.ident, self.constraint
        )
    }
}
