//! Project identification.
//!
//! A project is identified logically by its [`ProjectRoot`], the import path
//! prefix shared by every package it contains. A [`ProjectIdentifier`] adds
//! the optional upstream location the project should be fetched from instead
//! of the location its root deduces to.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The canonical import path prefix identifying a project.
///
/// Every package of a project lives at an import path equal to, or below,
/// its project root.
///
/// ## Examples
/// ```
/// use verdep_types::ProjectRoot;
///
/// let root = ProjectRoot::new("example.com/foo").unwrap();
/// assert!(root.contains("example.com/foo/bar"));
/// assert!(!root.contains("example.com/foobar"));
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectRoot(String);

impl ProjectRoot {
    /// Creates a new [`ProjectRoot`] from an import path prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is empty, contains whitespace, starts
    /// or ends with a `/`, or contains an empty path segment.
    pub fn new(root: impl Into<String>) -> Result<Self, Error> {
        let root = root.into();
        if root.is_empty()
            || root.starts_with('/')
            || root.ends_with('/')
            || root.split('/').any(|segment| segment.is_empty())
            || root.chars().any(char::is_whitespace)
        {
            return Err(Error::InvalidProjectRoot(root));
        }
        Ok(Self(root))
    }

    /// Returns the root as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether `import_path` belongs to this project.
    ///
    /// An import path belongs to a project if it equals the root or lives in
    /// a subdirectory of it.
    pub fn contains(&self, import_path: &str) -> bool {
        import_path == self.0
            || (import_path.starts_with(&self.0)
                && import_path[self.0.len()..].starts_with('/'))
    }
}

impl AsRef<str> for ProjectRoot {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ProjectRoot {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<String> for ProjectRoot {
    type Error = Error;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

impl From<ProjectRoot> for String {
    fn from(root: ProjectRoot) -> Self {
        root.0
    }
}

impl Display for ProjectRoot {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// A project root together with its optional upstream location override.
///
/// Two identifiers are compatible under a solve if their roots are equal and
/// their sources do not disagree, which is the case when both are empty, both
/// are equal, or one of them is empty.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProjectIdentifier {
    root: ProjectRoot,
    source: Option<String>,
}

impl ProjectIdentifier {
    /// Creates a new [`ProjectIdentifier`] with an explicit source override.
    pub fn new(root: ProjectRoot, source: Option<String>) -> Self {
        let source = source.filter(|source| !source.is_empty());
        Self { root, source }
    }

    /// Returns the project root.
    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Returns the source override, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the upstream location this identifier resolves through.
    ///
    /// This is the source override if one is set and the root otherwise.
    pub fn normalized_source(&self) -> &str {
        self.source.as_deref().unwrap_or_else(|| self.root.as_str())
    }

    /// Returns a copy of this identifier carrying `source` as its override.
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self::new(self.root.clone(), Some(source.into()))
    }

    /// Returns whether two identifiers may coexist in one solution.
    pub fn is_compatible_with(&self, other: &ProjectIdentifier) -> bool {
        self.root == other.root
            && match (&self.source, &other.source) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl From<ProjectRoot> for ProjectIdentifier {
    fn from(root: ProjectRoot) -> Self {
        Self { root, source: None }
    }
}

impl FromStr for ProjectIdentifier {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(ProjectRoot::new(input)?))
    }
}

impl Display for ProjectIdentifier {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(fmt, "{} (from {source})", self.root),
            None => write!(fmt, "{}", self.root),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("example.com/foo", true)]
    #[case("single", true)]
    #[case("", false)]
    #[case("/leading", false)]
    #[case("trailing/", false)]
    #[case("a//b", false)]
    #[case("a b", false)]
    fn project_root_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(ProjectRoot::new(input).is_ok(), valid);
    }

    #[rstest]
    #[case("example.com/foo", "example.com/foo", true)]
    #[case("example.com/foo", "example.com/foo/sub/pkg", true)]
    #[case("example.com/foo", "example.com/foobar", false)]
    #[case("example.com/foo", "example.com", false)]
    fn project_root_contains(#[case] root: &str, #[case] path: &str, #[case] contained: bool) {
        let root = ProjectRoot::new(root).unwrap();
        assert_eq!(root.contains(path), contained);
    }

    #[rstest]
    #[case(None, None, true)]
    #[case(Some("git.example.com/mirror"), None, true)]
    #[case(None, Some("git.example.com/mirror"), true)]
    #[case(Some("a"), Some("a"), true)]
    #[case(Some("a"), Some("b"), false)]
    fn identifier_compatibility(
        #[case] left: Option<&str>,
        #[case] right: Option<&str>,
        #[case] compatible: bool,
    ) {
        let root = ProjectRoot::new("example.com/foo").unwrap();
        let left = ProjectIdentifier::new(root.clone(), left.map(String::from));
        let right = ProjectIdentifier::new(root, right.map(String::from));
        assert_eq!(left.is_compatible_with(&right), compatible);
        assert_eq!(right.is_compatible_with(&left), compatible);
    }

    #[rstest]
    fn empty_source_is_normalized_away() {
        let root = ProjectRoot::new("example.com/foo").unwrap();
        let ident = ProjectIdentifier::new(root, Some(String::new()));
        assert_eq!(ident.source(), None);
        assert_eq!(ident.normalized_source(), "example.com/foo");
    }
}
