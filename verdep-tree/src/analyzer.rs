//! Walking a package directory into a [`PackageTree`].

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Error, parser::parse_source};

/// The file extension of source files.
pub const SOURCE_EXTENSION: &str = "src";

/// The suffix marking test files (by file stem) and external test packages
/// (by declared package name).
pub const TEST_SUFFIX: &str = "_test";

/// A problem that makes a directory unusable as a package.
///
/// These are data, not failures of the walk: the analyzer records them as
/// error entries so that reach computation and the solver can blame the
/// packages that import them.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize, Deserialize)]
pub enum PackageError {
    /// The directory has source files, but none contributes to the default
    /// configuration.
    #[error("no source files in the default configuration")]
    NoSourceFiles,

    /// Source files in the directory disagree on the package name.
    #[error("conflicting package names: {}", .names.join(", "))]
    ConflictingNames {
        /// The distinct names that were declared.
        names: Vec<String>,
    },

    /// A source file's header does not parse.
    #[error("malformed source file {file}: {message}")]
    MalformedSource {
        /// The offending file name.
        file: String,
        /// The rendered parse error.
        message: String,
    },

    /// A source file imports by local relative path.
    #[error("local relative import {import:?} in {file}")]
    LocalRelativeImport {
        /// The offending file name.
        file: String,
        /// The relative import path.
        import: String,
    },
}

/// One buildable package.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// The declared package name.
    pub name: String,
    /// The canonical import path from an import comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_comment: Option<String>,
    /// Imports of production files, sorted and unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Imports of test and external-test files, sorted and unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_imports: Vec<String>,
}

impl Package {
    /// Creates a package with no imports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            import_comment: None,
            imports: Vec::new(),
            test_imports: Vec::new(),
        }
    }

    /// Sets the production imports, sorting and deduplicating them.
    pub fn with_imports(mut self, imports: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.imports = sorted_unique(imports);
        self
    }

    /// Sets the test imports, sorting and deduplicating them.
    pub fn with_test_imports(
        mut self,
        imports: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.test_imports = sorted_unique(imports);
        self
    }
}

/// What a directory of a package tree resolved to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TreeEntry {
    /// A buildable package.
    Package(Package),
    /// A directory that cannot be used as a package.
    Error(PackageError),
}

impl TreeEntry {
    /// Returns the package, if this entry is one.
    pub fn as_package(&self) -> Option<&Package> {
        match self {
            Self::Package(package) => Some(package),
            Self::Error(_) => None,
        }
    }

    /// Returns the error, if this entry is one.
    pub fn as_error(&self) -> Option<&PackageError> {
        match self {
            Self::Package(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// The analyzed packages of one project, keyed by import path.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackageTree {
    import_root: String,
    packages: BTreeMap<String, TreeEntry>,
    /// Files excluded from the default configuration, per import path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    ignored_files: BTreeMap<String, Vec<String>>,
}

impl PackageTree {
    /// Creates an empty tree rooted at `import_root`.
    pub fn new(import_root: impl Into<String>) -> Self {
        Self {
            import_root: import_root.into(),
            packages: BTreeMap::new(),
            ignored_files: BTreeMap::new(),
        }
    }

    /// Returns the logical import root of the tree.
    pub fn import_root(&self) -> &str {
        &self.import_root
    }

    /// Returns all entries, keyed by import path.
    pub fn packages(&self) -> &BTreeMap<String, TreeEntry> {
        &self.packages
    }

    /// Returns the entry at `import_path`, if any.
    pub fn entry(&self, import_path: &str) -> Option<&TreeEntry> {
        self.packages.get(import_path)
    }

    /// Returns the package at `import_path` if it exists and is not an
    /// error entry.
    pub fn package(&self, import_path: &str) -> Option<&Package> {
        self.entry(import_path).and_then(TreeEntry::as_package)
    }

    /// Inserts an entry, replacing any previous entry at that path.
    pub fn insert(&mut self, import_path: impl Into<String>, entry: TreeEntry) {
        self.packages.insert(import_path.into(), entry);
    }

    /// Returns the files excluded from the default configuration.
    pub fn ignored_files(&self) -> &BTreeMap<String, Vec<String>> {
        &self.ignored_files
    }

    /// Returns whether `import_path` lies under this tree's import root.
    pub fn contains_path(&self, import_path: &str) -> bool {
        import_path == self.import_root
            || (import_path.starts_with(&self.import_root)
                && import_path[self.import_root.len()..].starts_with('/'))
    }
}

/// Analyzes the directory at `file_root` into the package tree rooted at
/// the logical import path `import_root`.
///
/// Directories whose base name starts with `.` or `_`, or equals
/// `testdata`, are skipped. Files excluded from the default configuration
/// by their build directives are tracked separately and not parsed for
/// imports. Directories without any source file produce no entry.
///
/// # Errors
///
/// Returns an error if `file_root` is not a directory or the walk fails
/// with an I/O error. Per-directory problems become error entries instead.
pub fn list_packages(
    file_root: impl AsRef<Path>,
    import_root: &str,
) -> Result<PackageTree, Error> {
    let file_root = file_root.as_ref();
    if !file_root.is_dir() {
        return Err(Error::NotADirectory(file_root.to_path_buf()));
    }
    let mut tree = PackageTree::new(import_root);
    walk_directory(file_root, import_root, &mut tree)?;
    Ok(tree)
}

fn walk_directory(dir: &Path, import_path: &str, tree: &mut PackageTree) -> Result<(), Error> {
    let entries = fs::read_dir(dir).map_err(|source| Error::IoPath {
        path: dir.to_path_buf(),
        context: "reading entries of directory",
        source,
    })?;

    let mut source_files = Vec::new();
    let mut subdirectories = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::IoPath {
            path: dir.to_path_buf(),
            context: "reading entry in directory",
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| Error::IoPath {
            path: entry.path(),
            context: "getting type of file",
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if file_type.is_dir() {
            if name.starts_with('.') || name.starts_with('_') || name == "testdata" {
                continue;
            }
            subdirectories.push((name, entry.path()));
        } else if file_type.is_file()
            && Path::new(&name)
                .extension()
                .is_some_and(|extension| extension == SOURCE_EXTENSION)
        {
            source_files.push((name, entry.path()));
        }
    }
    source_files.sort();
    subdirectories.sort();

    if !source_files.is_empty() {
        let (entry, ignored) = analyze_sources(&source_files)?;
        tree.packages.insert(import_path.to_string(), entry);
        if !ignored.is_empty() {
            tree.ignored_files.insert(import_path.to_string(), ignored);
        }
    }

    for (name, path) in subdirectories {
        let child_import_path = format!("{import_path}/{name}");
        walk_directory(&path, &child_import_path, tree)?;
    }
    Ok(())
}

/// How a source file contributes to its package.
enum FileKind {
    Production,
    Test,
    ExternalTest,
}

fn analyze_sources(files: &[(String, std::path::PathBuf)]) -> Result<(TreeEntry, Vec<String>), Error> {
    let mut ignored = Vec::new();
    let mut production_names = BTreeSet::new();
    let mut effective_names = BTreeSet::new();
    let mut raw_names = BTreeSet::new();
    let mut import_comment = None;
    let mut imports = BTreeSet::new();
    let mut test_imports = BTreeSet::new();
    let mut contributed = false;

    let default_tags = BTreeSet::new();
    for (name, path) in files {
        let contents = fs::read_to_string(path).map_err(|source| Error::IoPath {
            path: path.clone(),
            context: "reading source file",
            source,
        })?;
        let parsed = match parse_source(&contents) {
            Ok(parsed) => parsed,
            Err(message) => {
                return Ok((
                    TreeEntry::Error(PackageError::MalformedSource {
                        file: name.clone(),
                        message,
                    }),
                    ignored,
                ));
            }
        };

        if parsed
            .directives
            .iter()
            .any(|directive| !directive.evaluate(&default_tags))
        {
            ignored.push(name.clone());
            continue;
        }

        if let Some(import) = parsed
            .imports
            .iter()
            .find(|import| import.starts_with("./") || import.starts_with("../"))
        {
            return Ok((
                TreeEntry::Error(PackageError::LocalRelativeImport {
                    file: name.clone(),
                    import: import.clone(),
                }),
                ignored,
            ));
        }

        let stem = name
            .strip_suffix(&format!(".{SOURCE_EXTENSION}"))
            .unwrap_or(name.as_str());
        let kind = if stem.ends_with(TEST_SUFFIX) {
            FileKind::Test
        } else if parsed.package_name.ends_with(TEST_SUFFIX) {
            FileKind::ExternalTest
        } else {
            FileKind::Production
        };

        contributed = true;
        raw_names.insert(parsed.package_name.clone());
        match kind {
            FileKind::Production => {
                production_names.insert(parsed.package_name.clone());
                effective_names.insert(parsed.package_name.clone());
                if import_comment.is_none() {
                    import_comment = parsed.import_comment.clone();
                }
                imports.extend(parsed.imports);
            }
            FileKind::Test | FileKind::ExternalTest => {
                // Test files may declare either the package name or the
                // name with the test suffix appended.
                let effective = parsed
                    .package_name
                    .strip_suffix(TEST_SUFFIX)
                    .unwrap_or(&parsed.package_name);
                effective_names.insert(effective.to_string());
                test_imports.extend(parsed.imports);
            }
        }
    }

    if !contributed {
        return Ok((TreeEntry::Error(PackageError::NoSourceFiles), ignored));
    }
    if effective_names.len() > 1 {
        return Ok((
            TreeEntry::Error(PackageError::ConflictingNames {
                names: raw_names.into_iter().collect(),
            }),
            ignored,
        ));
    }

    let name = production_names
        .into_iter()
        .next()
        .or_else(|| effective_names.into_iter().next())
        .unwrap_or_default();
    let package = Package {
        name,
        import_comment,
        imports: imports.into_iter().collect(),
        test_imports: test_imports.into_iter().collect(),
    };
    Ok((TreeEntry::Package(package), ignored))
}

fn sorted_unique(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let set: BTreeSet<String> = items.into_iter().map(Into::into).collect();
    set.into_iter().collect()
}
