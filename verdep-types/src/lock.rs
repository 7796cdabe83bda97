//! The in-memory lock shape.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Error, ProjectIdentifier, ProjectRoot, Revision, UnpairedVersion, Version};

/// A SHA-256 digest of the canonically ordered solve inputs.
///
/// The digest serializes as lowercase hex. A lock whose digest differs from
/// the digest of the current inputs is stale.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InputsDigest([u8; 32]);

impl InputsDigest {
    /// Creates a digest from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parses a digest from its 64 character hex form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 64 lowercase hex characters.
    pub fn from_hex(input: &str) -> Result<Self, Error> {
        if input.len() != 64 || !input.is_ascii() {
            return Err(Error::InvalidDigest(input.to_string()));
        }
        let mut bytes = [0_u8; 32];
        for (index, byte) in bytes.iter_mut().enumerate() {
            let pair = &input[index * 2..index * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::InvalidDigest(input.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for InputsDigest {
    type Error = Error;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::from_hex(&input)
    }
}

impl From<InputsDigest> for String {
    fn from(digest: InputsDigest) -> Self {
        digest.to_string()
    }
}

impl Display for InputsDigest {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        for byte in self.0 {
            write!(fmt, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// One project pinned by a lock.
///
/// A locked project carries an optional surface version (a branch, plain
/// tag or semantic version), the revision it resolved to, and the packages
/// of the project that were selected. The serialized form stores branches
/// and other versions in separate fields and rejects entries carrying both.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLockedProject", into = "RawLockedProject")]
pub struct LockedProject {
    ident: ProjectIdentifier,
    version: Option<UnpairedVersion>,
    revision: Revision,
    packages: Vec<String>,
}

impl LockedProject {
    /// Creates a new locked project.
    ///
    /// Packages are sorted and deduplicated.
    pub fn new(
        ident: ProjectIdentifier,
        version: Option<UnpairedVersion>,
        revision: Revision,
        packages: Vec<String>,
    ) -> Self {
        let mut packages = packages;
        packages.sort();
        packages.dedup();
        Self {
            ident,
            version,
            revision,
            packages,
        }
    }

    /// Returns the project identifier.
    pub fn ident(&self) -> &ProjectIdentifier {
        &self.ident
    }

    /// Returns the surface version, if one was recorded.
    pub fn version(&self) -> Option<&UnpairedVersion> {
        self.version.as_ref()
    }

    /// Returns the pinned revision.
    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Returns the selected packages, sorted.
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Returns the pinned version in its most determined form.
    ///
    /// This is the surface version paired with the revision when a surface
    /// version was recorded and the bare revision otherwise.
    pub fn version_pair(&self) -> Version {
        match &self.version {
            Some(unpaired) => Version::Paired(unpaired.clone().pair(self.revision.clone())),
            None => Version::Revision(self.revision.clone()),
        }
    }
}

impl Display for LockedProject {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match &self.version {
            Some(version) => {
                write!(fmt, "{}@{} ({})", self.ident, version, self.revision.short())
            }
            None => write!(fmt, "{}@{}", self.ident, self.revision.short()),
        }
    }
}

/// The serialized shape of a [`LockedProject`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawLockedProject {
    root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    revision: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    packages: Vec<String>,
}

impl TryFrom<RawLockedProject> for LockedProject {
    type Error = Error;

    fn try_from(raw: RawLockedProject) -> Result<Self, Self::Error> {
        if raw.branch.is_some() && raw.version.is_some() {
            return Err(Error::BranchAndVersion(raw.root));
        }
        let root = ProjectRoot::new(raw.root)?;
        let version = match (raw.branch, raw.version) {
            (Some(branch), None) => Some(UnpairedVersion::branch(branch)),
            (None, Some(version)) => Some(UnpairedVersion::tag(version)),
            (None, None) => None,
            (Some(_), Some(_)) => unreachable!("rejected above"),
        };
        Ok(Self::new(
            ProjectIdentifier::new(root, raw.source),
            version,
            Revision::new(raw.revision)?,
            raw.packages,
        ))
    }
}

impl From<LockedProject> for RawLockedProject {
    fn from(project: LockedProject) -> Self {
        let (branch, version) = match project.version {
            Some(UnpairedVersion::Branch(name)) => (Some(name), None),
            Some(other) => (None, Some(other.to_string())),
            None => (None, None),
        };
        Self {
            root: project.ident.root().to_string(),
            source: project.ident.source().map(String::from),
            branch,
            version,
            revision: project.revision.to_string(),
            packages: project.packages,
        }
    }
}

/// A solve result pinned for reproduction.
///
/// Locked projects are kept sorted by project root so that serialization is
/// stable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    digest: InputsDigest,
    projects: Vec<LockedProject>,
}

impl Lock {
    /// Creates a lock from a digest and its projects.
    ///
    /// Projects are sorted by root.
    pub fn new(digest: InputsDigest, mut projects: Vec<LockedProject>) -> Self {
        projects.sort_by(|a, b| a.ident().root().cmp(b.ident().root()));
        Self { digest, projects }
    }

    /// Returns the digest of the inputs this lock was produced from.
    pub fn digest(&self) -> &InputsDigest {
        &self.digest
    }

    /// Returns the locked projects, sorted by root.
    pub fn projects(&self) -> &[LockedProject] {
        &self.projects
    }

    /// Returns the locked project for `root`, if any.
    pub fn project_for(&self, root: &ProjectRoot) -> Option<&LockedProject> {
        self.projects
            .iter()
            .find(|project| project.ident().root() == root)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn ident(root: &str) -> ProjectIdentifier {
        ProjectIdentifier::from(ProjectRoot::new(root).unwrap())
    }

    #[rstest]
    fn rejects_branch_and_version_together() {
        let raw = RawLockedProject {
            root: "example.com/a".to_string(),
            source: None,
            branch: Some("main".to_string()),
            version: Some("1.0.0".to_string()),
            revision: "aa".to_string(),
            packages: vec![],
        };
        assert_eq!(
            LockedProject::try_from(raw),
            Err(Error::BranchAndVersion("example.com/a".to_string()))
        );
    }

    #[rstest]
    fn lock_round_trips_through_json() -> TestResult {
        let lock = Lock::new(
            InputsDigest::new([7; 32]),
            vec![
                LockedProject::new(
                    ident("example.com/b"),
                    Some(UnpairedVersion::branch("main")),
                    Revision::new("bbbb")?,
                    vec!["example.com/b".to_string()],
                ),
                LockedProject::new(
                    ident("example.com/a"),
                    Some(UnpairedVersion::semver("1.0.0")?),
                    Revision::new("aaaa")?,
                    vec![
                        "example.com/a/pkg".to_string(),
                        "example.com/a".to_string(),
                    ],
                ),
            ],
        );

        // Construction sorts projects by root and packages within.
        assert_eq!(lock.projects()[0].ident(), &ident("example.com/a"));
        assert_eq!(
            lock.projects()[0].packages(),
            ["example.com/a", "example.com/a/pkg"]
        );

        let encoded = serde_json::to_string(&lock)?;
        let decoded: Lock = serde_json::from_str(&encoded)?;
        assert_eq!(lock, decoded);
        Ok(())
    }

    #[rstest]
    fn version_pair_prefers_surface_version() -> TestResult {
        let revision = Revision::new("cafe")?;
        let with_version = LockedProject::new(
            ident("example.com/a"),
            Some(UnpairedVersion::semver("1.0.0")?),
            revision.clone(),
            vec![],
        );
        assert!(matches!(with_version.version_pair(), Version::Paired(_)));

        let bare = LockedProject::new(ident("example.com/a"), None, revision, vec![]);
        assert!(matches!(bare.version_pair(), Version::Revision(_)));
        Ok(())
    }

    #[rstest]
    fn digest_hex_round_trip() -> TestResult {
        let digest = InputsDigest::new([0xab; 32]);
        let hex = digest.to_string();
        assert_eq!(hex.len(), 64);
        assert_eq!(InputsDigest::from_hex(&hex)?, digest);
        assert!(InputsDigest::from_hex("xyz").is_err());
        Ok(())
    }
}
