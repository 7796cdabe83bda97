//! Constraints over versions.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Revision, SemverRange, UnpairedVersion, Version};

/// A property a project's version must satisfy.
///
/// Versions themselves act as equality constraints. `Any` is the identity of
/// intersection and `None` its absorber. The union variant collects
/// constraints that the source bridge discovered to be equivalent through a
/// shared revision.
///
/// All operations here are pure shape-level semantics: a bare branch and a
/// bare revision never match by shape alone. Matching becomes authoritative
/// only when performed through the source bridge, which reconciles version
/// types by resolving them to revisions.
///
/// ## Examples
/// ```
/// use verdep_types::{Constraint, UnpairedVersion, Version};
///
/// let range: Constraint = "^1.0.0".parse().unwrap();
/// let version: Version = UnpairedVersion::semver("1.4.2").unwrap().into();
/// assert!(range.matches(&version));
/// assert!(range.matches_any(&"~1.4.0".parse().unwrap()));
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Matches every version.
    Any,
    /// Matches no version.
    None,
    /// Matches versions equal to the carried version.
    Version(Version),
    /// Matches semantic versions admitted by the range.
    Range(SemverRange),
    /// Matches versions admitted by any member.
    Union(Vec<Constraint>),
}

impl Constraint {
    /// Creates a range constraint from a range expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression does not parse.
    pub fn range(expression: &str) -> Result<Self, Error> {
        Ok(Self::Range(SemverRange::parse(expression)?))
    }

    /// Returns whether this is the universal constraint.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns whether this constraint matches nothing.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns whether `version` is admissible under this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::None => false,
            Self::Version(own) => own.matches(version),
            Self::Range(range) => range_admits_version(range, version),
            Self::Union(members) => members.iter().any(|member| member.matches(version)),
        }
    }

    /// Returns whether the intersection with `other` is non-empty.
    pub fn matches_any(&self, other: &Constraint) -> bool {
        !self.intersect(other).is_none()
    }

    /// Intersects two constraints.
    ///
    /// Intersection is commutative; `Any` is its identity and `None` its
    /// absorber. Intersecting a paired version with a constraint collapses
    /// to the paired version whenever the constraint admits it.
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        match (self, other) {
            (Self::Any, c) | (c, Self::Any) => c.clone(),
            (Self::None, _) | (_, Self::None) => Self::None,
            (Self::Union(members), c) | (c, Self::Union(members)) => {
                let mut survivors: Vec<Constraint> = members
                    .iter()
                    .map(|member| member.intersect(c))
                    .filter(|member| !member.is_none())
                    .collect();
                match survivors.len() {
                    0 => Self::None,
                    1 => survivors.remove(0),
                    _ => Self::Union(survivors),
                }
            }
            (Self::Range(a), Self::Range(b)) => {
                let intersection = a.intersect(b);
                if intersection.is_empty() {
                    Self::None
                } else {
                    Self::Range(intersection)
                }
            }
            (Self::Range(range), Self::Version(version))
            | (Self::Version(version), Self::Range(range)) => {
                if range_admits_version(range, version) {
                    Self::Version(version.clone())
                } else {
                    Self::None
                }
            }
            (Self::Version(a), Self::Version(b)) => {
                if !a.matches(b) {
                    return Self::None;
                }
                // Prefer the more determined side so that intersection
                // stays commutative in value.
                if determination(b) > determination(a) {
                    Self::Version(b.clone())
                } else {
                    Self::Version(a.clone())
                }
            }
        }
    }

    /// Returns the revision this constraint pins, if it pins one.
    pub fn underlying(&self) -> Option<&Revision> {
        match self {
            Self::Version(version) => version.underlying(),
            Self::Union(members) => members.iter().find_map(Constraint::underlying),
            Self::Any | Self::None | Self::Range(_) => None,
        }
    }
}

/// Shape-level admission of a version by a range.
fn range_admits_version(range: &SemverRange, version: &Version) -> bool {
    match version {
        Version::Union(members) => members
            .iter()
            .any(|member| range_admits_version(range, member)),
        _ => version
            .unpaired()
            .and_then(UnpairedVersion::as_semver)
            .is_some_and(|semver| range.admits(semver)),
    }
}

/// How much a version pins down: pairs beat bare revisions beat surface
/// versions.
fn determination(version: &Version) -> u8 {
    match version {
        Version::Paired(_) => 3,
        Version::Revision(_) => 2,
        Version::Unpaired(_) => 1,
        Version::Union(_) => 0,
    }
}

impl From<Version> for Constraint {
    fn from(version: Version) -> Self {
        Self::Version(version)
    }
}

impl From<SemverRange> for Constraint {
    fn from(range: SemverRange) -> Self {
        Self::Range(range)
    }
}

impl FromStr for Constraint {
    type Err = Error;

    /// Parses a constraint from its textual form.
    ///
    /// `*` and `any` parse to [`Constraint::Any`], `none` to
    /// [`Constraint::None`]. Anything that parses as a semver range becomes
    /// a range constraint; everything else becomes an equality constraint
    /// on a plain version. Branch constraints must be built explicitly, the
    /// textual form cannot distinguish a branch name from a plain tag.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        match trimmed {
            "" => Err(Error::InvalidRange(input.to_string())),
            "*" | "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            _ => match SemverRange::parse(trimmed) {
                Ok(range) => Ok(Self::Range(range)),
                Err(_) => Ok(Self::Version(Version::Unpaired(UnpairedVersion::Plain(
                    trimmed.to_string(),
                )))),
            },
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Any => write!(fmt, "*"),
            Self::None => write!(fmt, "none"),
            Self::Version(version) => write!(fmt, "{version}"),
            Self::Range(range) => write!(fmt, "{range}"),
            Self::Union(members) => {
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        write!(fmt, " || ")?;
                    }
                    write!(fmt, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn semver(input: &str) -> Version {
        UnpairedVersion::semver(input).unwrap().into()
    }

    fn constraint(input: &str) -> Constraint {
        input.parse().unwrap()
    }

    #[rstest]
    #[case("*", "1.0.0", true)]
    #[case("none", "1.0.0", false)]
    #[case("^1.0.0", "1.4.2", true)]
    #[case("^1.0.0", "2.0.0", false)]
    #[case("1.0.0", "1.0.0", true)]
    fn matching(#[case] constraint_input: &str, #[case] version: &str, #[case] matched: bool) {
        assert_eq!(constraint(constraint_input).matches(&semver(version)), matched);
    }

    #[rstest]
    fn any_and_none_are_identity_and_absorber() {
        let range = constraint("^1.0.0");
        assert_eq!(Constraint::Any.intersect(&range), range);
        assert_eq!(range.intersect(&Constraint::Any), range);
        assert_eq!(range.intersect(&Constraint::None), Constraint::None);
        assert_eq!(Constraint::None.intersect(&Constraint::Any), Constraint::None);
    }

    #[rstest]
    #[case("^1.0.0", "~1.4.0", true)]
    #[case("^1.0.0", "^2.0.0", false)]
    #[case("1.0.0", "^1.0.0", true)]
    #[case("1.0.0", "2.0.0", false)]
    fn intersection_agrees_with_matches_any(
        #[case] left: &str,
        #[case] right: &str,
        #[case] overlapping: bool,
    ) {
        let left = constraint(left);
        let right = constraint(right);
        assert_eq!(left.matches_any(&right), overlapping);
        assert_eq!(right.matches_any(&left), overlapping);
        assert_eq!(
            left.intersect(&right).is_none(),
            !overlapping,
            "matches_any must agree with intersect"
        );
    }

    #[rstest]
    fn intersection_is_commutative() {
        let cases = ["^1.0.0", "~1.2.0", "1.2.3", "*", "none"];
        for left in cases {
            for right in cases {
                let left = constraint(left);
                let right = constraint(right);
                assert_eq!(left.intersect(&right), right.intersect(&left));
            }
        }
    }

    #[rstest]
    fn paired_version_collapses_intersection() -> TestResult {
        let revision = Revision::new("0ddba11".to_string())?;
        let paired: Version = UnpairedVersion::semver("1.2.0")?.pair(revision).into();
        let range = constraint("^1.0.0");
        let intersection = range.intersect(&Constraint::Version(paired.clone()));
        assert_eq!(intersection, Constraint::Version(paired.clone()));
        assert!(intersection.underlying().is_some());

        // The paired side wins over an equal unpaired version.
        let unpaired = Constraint::Version(semver("1.2.0"));
        let intersection = unpaired.intersect(&Constraint::Version(paired.clone()));
        assert_eq!(intersection, Constraint::Version(paired));
        Ok(())
    }

    #[rstest]
    fn union_distributes_over_intersection() {
        let union = Constraint::Union(vec![constraint("^1.0.0"), constraint("^3.0.0")]);
        let narrowed = union.intersect(&constraint(">=1.2.0, <4.0.0"));
        assert!(narrowed.matches(&semver("1.4.0")));
        assert!(narrowed.matches(&semver("3.1.0")));
        assert!(!narrowed.matches(&semver("2.0.0")));
    }
}
