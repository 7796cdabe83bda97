//! The result of a successful solve.

use std::fmt::{Display, Formatter};

use verdep_types::{InputsDigest, Lock, LockedProject};

/// A complete assignment of one version per required project.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Solution {
    digest: InputsDigest,
    projects: Vec<LockedProject>,
    attempts: u64,
}

impl Solution {
    /// Creates a solution; projects are sorted by root.
    pub(crate) fn new(
        digest: InputsDigest,
        mut projects: Vec<LockedProject>,
        attempts: u64,
    ) -> Self {
        projects.sort_by(|a, b| a.ident().root().cmp(b.ident().root()));
        Self {
            digest,
            projects,
            attempts,
        }
    }

    /// Returns the digest of the inputs this solution was computed from.
    pub fn digest(&self) -> &InputsDigest {
        &self.digest
    }

    /// Returns the locked projects, sorted by root.
    pub fn projects(&self) -> &[LockedProject] {
        &self.projects
    }

    /// Returns how many satisfiability attempts the solve took.
    ///
    /// Deterministic for identical inputs and identical source responses.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Converts the solution into the lock shape.
    pub fn into_lock(self) -> Lock {
        Lock::new(self.digest, self.projects)
    }

    /// Returns the solution as a lock without consuming it.
    pub fn to_lock(&self) -> Lock {
        Lock::new(self.digest, self.projects.clone())
    }
}

impl Display for Solution {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        writeln!(fmt, "{} projects, {} attempts", self.projects.len(), self.attempts)?;
        for project in &self.projects {
            writeln!(fmt, "  {project}")?;
        }
        Ok(())
    }
}
