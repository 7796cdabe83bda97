//! Immutable content identifiers.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// An opaque, immutable content identifier, such as a commit hash.
///
/// Revisions are terminal: they cannot be resolved any further and two
/// revisions are equal exactly when their strings are equal.
///
/// ## Examples
/// ```
/// use verdep_types::Revision;
///
/// let revision = Revision::new("deadbeef").unwrap();
/// assert_eq!(revision.as_str(), "deadbeef");
/// assert!(Revision::new("").is_err());
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
    /// Creates a new [`Revision`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty.
    pub fn new(revision: impl Into<String>) -> Result<Self, Error> {
        let revision = revision.into();
        if revision.is_empty() {
            return Err(Error::EmptyRevision);
        }
        Ok(Self(revision))
    }

    /// Returns the revision as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns an abbreviated form for human-readable output.
    ///
    /// At most the first eight bytes of the identifier are returned. The
    /// full identifier is returned if shortening would split a multi-byte
    /// character.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl AsRef<str> for Revision {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<String> for Revision {
    type Error = Error;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

impl From<Revision> for String {
    fn from(revision: Revision) -> Self {
        revision.0
    }
}

impl Display for Revision {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0123456789abcdef", "01234567")]
    #[case("abc", "abc")]
    fn short_form(#[case] input: &str, #[case] short: &str) {
        assert_eq!(Revision::new(input).unwrap().short(), short);
    }
}
