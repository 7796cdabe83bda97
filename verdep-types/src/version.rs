//! Version types and their ordering.
//!
//! A version names a point in a project's history. Branches and plain tags
//! are surface names, semantic versions additionally order by semver
//! precedence, and revisions are the immutable identifiers every surface
//! name ultimately resolves to. A [`PairedVersion`] is a surface name bound
//! to its revision, as produced by a version-control listing.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use semver::Version as SemverVersion;
use serde::{Deserialize, Serialize};

use crate::{Error, Revision};

/// A surface version that is not (or not yet) bound to its revision.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum UnpairedVersion {
    /// A mutable, named line of development.
    Branch(String),
    /// A non-semver tag, immutable by identity.
    Plain(String),
    /// A tag parsed as a semantic version, ordered by semver precedence.
    Semver(SemverVersion),
}

impl UnpairedVersion {
    /// Creates a branch version.
    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch(name.into())
    }

    /// Creates a version from a tag name.
    ///
    /// The tag is interpreted as a semantic version if it parses as one,
    /// with an optional leading `v` tolerated, and as a plain tag otherwise.
    ///
    /// ## Examples
    /// ```
    /// use verdep_types::UnpairedVersion;
    ///
    /// assert!(matches!(
    ///     UnpairedVersion::tag("v1.0.0"),
    ///     UnpairedVersion::Semver(_)
    /// ));
    /// assert!(matches!(
    ///     UnpairedVersion::tag("beta-live"),
    ///     UnpairedVersion::Plain(_)
    /// ));
    /// ```
    pub fn tag(name: impl Into<String>) -> Self {
        let name = name.into();
        let candidate = name.strip_prefix('v').unwrap_or(&name);
        match SemverVersion::parse(candidate) {
            Ok(version) => Self::Semver(version),
            Err(_) => Self::Plain(name),
        }
    }

    /// Creates a semantic version from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not parse as a semantic version.
    pub fn semver(input: &str) -> Result<Self, Error> {
        SemverVersion::parse(input)
            .map(Self::Semver)
            .map_err(|error| Error::InvalidSemver {
                input: input.to_string(),
                reason: error.to_string(),
            })
    }

    /// Returns the parsed semantic version, if this is one.
    pub fn as_semver(&self) -> Option<&SemverVersion> {
        match self {
            Self::Semver(version) => Some(version),
            Self::Branch(_) | Self::Plain(_) => None,
        }
    }

    /// Returns whether this is a branch.
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// Binds this surface version to the revision it resolves to.
    pub fn pair(self, revision: Revision) -> PairedVersion {
        PairedVersion {
            unpaired: self,
            revision,
        }
    }
}

impl Display for UnpairedVersion {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Branch(name) | Self::Plain(name) => write!(fmt, "{name}"),
            Self::Semver(version) => write!(fmt, "{version}"),
        }
    }
}

/// A surface version bound to the revision it resolves to.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct PairedVersion {
    unpaired: UnpairedVersion,
    revision: Revision,
}

impl PairedVersion {
    /// Returns the surface version.
    pub fn unpaired(&self) -> &UnpairedVersion {
        &self.unpaired
    }

    /// Returns the underlying revision.
    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Splits the pair into its surface version and revision.
    pub fn into_parts(self) -> (UnpairedVersion, Revision) {
        (self.unpaired, self.revision)
    }
}

impl Display for PairedVersion {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.unpaired)
    }
}

/// Any version a project can be at.
///
/// The union variant collects versions discovered to share a revision. It is
/// produced by the source bridge while reconciling comparisons across
/// version types and never appears in solver output.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Version {
    /// A bare revision.
    Revision(Revision),
    /// A surface version without a known revision.
    Unpaired(UnpairedVersion),
    /// A surface version bound to its revision.
    Paired(PairedVersion),
    /// Versions known to share a revision.
    Union(Vec<Version>),
}

impl Version {
    /// Returns whether `other` is admissible under this version acting as an
    /// equality constraint.
    ///
    /// Revisions match only revisions and pairs carrying the same revision.
    /// Surface versions match by equality, directly or against the surface
    /// part of a pair. Pairs match anything sharing their revision and fall
    /// back to their surface part against unpaired versions. This is the
    /// pure, shape-level contract; reconciling a bare branch against a bare
    /// revision requires the source bridge.
    pub fn matches(&self, other: &Version) -> bool {
        match (self, other) {
            (Self::Union(members), _) => members.iter().any(|member| member.matches(other)),
            (_, Self::Union(members)) => members.iter().any(|member| self.matches(member)),
            (Self::Revision(a), Self::Revision(b)) => a == b,
            (Self::Revision(a), Self::Paired(b)) => a == b.revision(),
            (Self::Revision(_), Self::Unpaired(_)) => false,
            (Self::Unpaired(a), Self::Unpaired(b)) => a == b,
            (Self::Unpaired(a), Self::Paired(b)) => a == b.unpaired(),
            (Self::Unpaired(_), Self::Revision(_)) => false,
            (Self::Paired(a), Self::Paired(b)) => a.revision() == b.revision(),
            (Self::Paired(a), Self::Revision(b)) => a.revision() == b,
            (Self::Paired(a), Self::Unpaired(b)) => a.unpaired() == b,
        }
    }

    /// Returns the revision this version is known to resolve to, if any.
    pub fn underlying(&self) -> Option<&Revision> {
        match self {
            Self::Revision(revision) => Some(revision),
            Self::Paired(paired) => Some(paired.revision()),
            Self::Unpaired(_) => None,
            Self::Union(members) => members.iter().find_map(Version::underlying),
        }
    }

    /// Returns the surface part of this version, if it has one.
    pub fn unpaired(&self) -> Option<&UnpairedVersion> {
        match self {
            Self::Unpaired(unpaired) => Some(unpaired),
            Self::Paired(paired) => Some(paired.unpaired()),
            Self::Revision(_) => None,
            Self::Union(members) => members.iter().find_map(Version::unpaired),
        }
    }

    /// Returns whether this version is already bound to a revision.
    pub fn is_revision_backed(&self) -> bool {
        matches!(self, Self::Revision(_) | Self::Paired(_))
    }
}

impl From<Revision> for Version {
    fn from(revision: Revision) -> Self {
        Self::Revision(revision)
    }
}

impl From<UnpairedVersion> for Version {
    fn from(unpaired: UnpairedVersion) -> Self {
        Self::Unpaired(unpaired)
    }
}

impl From<PairedVersion> for Version {
    fn from(paired: PairedVersion) -> Self {
        Self::Paired(paired)
    }
}

impl Display for Version {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Revision(revision) => write!(fmt, "{revision}"),
            Self::Unpaired(unpaired) => write!(fmt, "{unpaired}"),
            Self::Paired(paired) => write!(fmt, "{paired}"),
            Self::Union(members) => {
                let mut first = true;
                for member in members {
                    if !first {
                        write!(fmt, "|")?;
                    }
                    write!(fmt, "{member}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Sorts a version list into upgrade preference order.
///
/// Semantic versions come first, full releases descending by precedence,
/// then all pre-releases descending among themselves. Plain tags, branches
/// and bare revisions follow, each group in ascending lexicographic order.
///
/// ## Examples
/// ```
/// use verdep_types::{UnpairedVersion, Version, sort_for_upgrade};
///
/// let mut versions: Vec<Version> = ["1.0.0", "1.0.1", "1.0.0-alpha"]
///     .iter()
///     .map(|v| UnpairedVersion::semver(v).unwrap().into())
///     .collect();
/// sort_for_upgrade(&mut versions);
/// let shown: Vec<String> = versions.iter().map(ToString::to_string).collect();
/// assert_eq!(shown, ["1.0.1", "1.0.0", "1.0.0-alpha"]);
/// ```
pub fn sort_for_upgrade(versions: &mut [Version]) {
    versions.sort_by(|a, b| preference_cmp(a, b, Direction::Upgrade));
}

/// Sorts a version list into downgrade preference order.
///
/// The coarse order across version types is unchanged; within semantic
/// versions the upgrade order is reversed, so pre-releases ascending come
/// first, followed by full releases ascending.
pub fn sort_for_downgrade(versions: &mut [Version]) {
    versions.sort_by(|a, b| preference_cmp(a, b, Direction::Downgrade));
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Direction {
    Upgrade,
    Downgrade,
}

/// Coarse order across version types: semver, plain, branch, revision.
fn type_rank(version: &Version) -> u8 {
    match version {
        Version::Unpaired(unpaired) => unpaired_rank(unpaired),
        Version::Paired(paired) => unpaired_rank(paired.unpaired()),
        Version::Revision(_) => 3,
        Version::Union(_) => 4,
    }
}

fn unpaired_rank(unpaired: &UnpairedVersion) -> u8 {
    match unpaired {
        UnpairedVersion::Semver(_) => 0,
        UnpairedVersion::Plain(_) => 1,
        UnpairedVersion::Branch(_) => 2,
    }
}

fn preference_cmp(a: &Version, b: &Version, direction: Direction) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a.unpaired(), b.unpaired()) {
        (Some(UnpairedVersion::Semver(a)), Some(UnpairedVersion::Semver(b))) => {
            let upgrade = semver_upgrade_cmp(a, b);
            match direction {
                Direction::Upgrade => upgrade,
                Direction::Downgrade => upgrade.reverse(),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Upgrade preference between two semantic versions.
///
/// Full releases order before any pre-release and descend by precedence;
/// pre-releases descend among themselves.
fn semver_upgrade_cmp(a: &SemverVersion, b: &SemverVersion) -> Ordering {
    match (a.pre.is_empty(), b.pre.is_empty()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.cmp(a),
    }
}
