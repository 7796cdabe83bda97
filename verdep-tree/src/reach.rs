//! Transitive import reach over a package tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{PackageError, PackageTree};

/// Import paths and path prefixes excised from reach computation.
///
/// An ignored import path is removed from the graph as if it were never
/// imported. A pattern with a trailing `*` ignores every path starting
/// with the prefix before the `*`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IgnoreSet {
    exact: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl IgnoreSet {
    /// Creates an ignore set from patterns, deduplicating them.
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut exact = BTreeSet::new();
        let mut prefixes = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            match pattern.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(pattern);
                }
            }
        }
        prefixes.sort();
        prefixes.dedup();
        Self { exact, prefixes }
    }

    /// Returns whether `import_path` is ignored.
    pub fn is_ignored(&self, import_path: &str) -> bool {
        self.exact.contains(import_path)
            || self
                .prefixes
                .iter()
                .any(|prefix| import_path.starts_with(prefix.as_str()))
    }

    /// Returns whether no pattern is set.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

/// What one package transitively reaches.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReachEntry {
    /// Other in-tree packages transitively imported, sorted.
    pub internal: Vec<String>,
    /// Out-of-tree import paths transitively reached, sorted.
    pub external: Vec<String>,
}

/// The reach of a set of root packages over a package tree.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReachMap {
    entries: BTreeMap<String, ReachEntry>,
    errors: BTreeMap<String, PackageError>,
}

impl ReachMap {
    /// Returns the per-package reach entries, keyed by import path.
    pub fn entries(&self) -> &BTreeMap<String, ReachEntry> {
        &self.entries
    }

    /// Returns the entry for `import_path`, if it has one.
    pub fn entry(&self, import_path: &str) -> Option<&ReachEntry> {
        self.entries.get(import_path)
    }

    /// Returns the packages excluded because of an error, own or
    /// inherited, with that error.
    pub fn errors(&self) -> &BTreeMap<String, PackageError> {
        &self.errors
    }

    /// Returns the union of all external reach, sorted and unique.
    pub fn external_union(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .entries
            .values()
            .flat_map(|entry| entry.external.iter().map(String::as_str))
            .collect();
        set.into_iter().map(String::from).collect()
    }
}

/// Parameters of a reach computation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReachQuery<'a> {
    /// The root packages to report reach for. `None` explores every
    /// non-error package of the tree.
    pub roots: Option<&'a [String]>,
    /// Whether test imports participate in the graph.
    pub include_tests: bool,
    /// Whether packages transitively importing an error package inherit
    /// that error and are excluded. When false, error packages are excised
    /// from the graph but importers keep their entries.
    pub backprop: bool,
    /// Whether packages participating in an import cycle are dropped from
    /// the result. When false, cycle members keep entries and share their
    /// reach.
    pub strict_cycles: bool,
}

impl PackageTree {
    /// Computes which packages each root package transitively reaches.
    ///
    /// Ignored import paths are treated as if they were never imported.
    /// External paths matching `is_standard` are excluded from external
    /// reach. Internal imports of packages that do not exist in the tree
    /// contribute nothing.
    pub fn reach(
        &self,
        query: &ReachQuery,
        ignore: &IgnoreSet,
        is_standard: &dyn Fn(&str) -> bool,
    ) -> ReachMap {
        let mut errors = BTreeMap::new();
        let mut internal_edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut external_edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (path, entry) in self.packages() {
            if ignore.is_ignored(path) {
                continue;
            }
            let package = match entry {
                crate::TreeEntry::Package(package) => package,
                crate::TreeEntry::Error(error) => {
                    errors.insert(path.clone(), error.clone());
                    continue;
                }
            };
            let mut internal = BTreeSet::new();
            let mut external = BTreeSet::new();
            let imports = package.imports.iter().chain(
                query
                    .include_tests
                    .then_some(&package.test_imports)
                    .into_iter()
                    .flatten(),
            );
            for import in imports {
                if import == path || ignore.is_ignored(import) {
                    continue;
                }
                if self.contains_path(import) {
                    internal.insert(import.clone());
                } else if !is_standard(import) {
                    external.insert(import.clone());
                }
            }
            internal_edges.insert(path.clone(), internal);
            external_edges.insert(path.clone(), external);
        }

        if query.backprop {
            propagate_errors(&mut internal_edges, &mut external_edges, &mut errors);
        }
        if query.strict_cycles {
            drop_cycle_members(&mut internal_edges, &mut external_edges);
        }

        // Edges to packages that are missing, excised or dropped
        // contribute nothing.
        let surviving: BTreeSet<String> = internal_edges.keys().cloned().collect();
        for targets in internal_edges.values_mut() {
            targets.retain(|target| surviving.contains(target));
        }

        let (internal_reach, external_reach) =
            transitive_closure(&internal_edges, &external_edges);

        let mut entries = BTreeMap::new();
        for path in internal_edges.keys() {
            if let Some(roots) = query.roots {
                if !roots.iter().any(|root| root == path) {
                    continue;
                }
            }
            let mut internal = internal_reach[path].clone();
            internal.remove(path);
            entries.insert(
                path.clone(),
                ReachEntry {
                    internal: internal.into_iter().collect(),
                    external: external_reach[path].iter().cloned().collect(),
                },
            );
        }
        ReachMap { entries, errors }
    }
}

/// Removes packages that transitively import an error package, recording
/// the inherited error for each.
fn propagate_errors(
    internal_edges: &mut BTreeMap<String, BTreeSet<String>>,
    external_edges: &mut BTreeMap<String, BTreeSet<String>>,
    errors: &mut BTreeMap<String, PackageError>,
) {
    loop {
        let poisoned: Vec<(String, PackageError)> = internal_edges
            .iter()
            .find_map(|(path, targets)| {
                targets.iter().find_map(|target| {
                    errors
                        .get(target)
                        .map(|error| (path.clone(), error.clone()))
                })
            })
            .into_iter()
            .collect();
        if poisoned.is_empty() {
            return;
        }
        for (path, error) in poisoned {
            internal_edges.remove(&path);
            external_edges.remove(&path);
            errors.insert(path, error);
        }
    }
}

/// Removes every package that participates in an import cycle.
fn drop_cycle_members(
    internal_edges: &mut BTreeMap<String, BTreeSet<String>>,
    external_edges: &mut BTreeMap<String, BTreeSet<String>>,
) {
    let members = cycle_members(internal_edges);
    for path in members {
        internal_edges.remove(&path);
        external_edges.remove(&path);
    }
}

/// Finds all nodes on a cycle via strongly connected components.
fn cycle_members(edges: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    struct State<'a> {
        edges: &'a BTreeMap<String, BTreeSet<String>>,
        index: usize,
        indices: BTreeMap<&'a str, usize>,
        lowlinks: BTreeMap<&'a str, usize>,
        on_stack: BTreeSet<&'a str>,
        stack: Vec<&'a str>,
        members: BTreeSet<String>,
    }

    fn visit<'a>(state: &mut State<'a>, node: &'a str) {
        state.indices.insert(node, state.index);
        state.lowlinks.insert(node, state.index);
        state.index += 1;
        state.stack.push(node);
        state.on_stack.insert(node);

        if let Some(targets) = state.edges.get(node) {
            for target in targets {
                let target = target.as_str();
                if !state.edges.contains_key(target) {
                    continue;
                }
                if !state.indices.contains_key(target) {
                    visit(state, target);
                    let low = state.lowlinks[target].min(state.lowlinks[node]);
                    state.lowlinks.insert(node, low);
                } else if state.on_stack.contains(target) {
                    let low = state.indices[target].min(state.lowlinks[node]);
                    state.lowlinks.insert(node, low);
                }
            }
        }

        if state.lowlinks[node] == state.indices[node] {
            let mut component = Vec::new();
            while let Some(top) = state.stack.pop() {
                state.on_stack.remove(top);
                component.push(top);
                if top == node {
                    break;
                }
            }
            let is_cycle = component.len() > 1
                || state
                    .edges
                    .get(node)
                    .is_some_and(|targets| targets.contains(node));
            if is_cycle {
                state
                    .members
                    .extend(component.into_iter().map(String::from));
            }
        }
    }

    let mut state = State {
        edges,
        index: 0,
        indices: BTreeMap::new(),
        lowlinks: BTreeMap::new(),
        on_stack: BTreeSet::new(),
        stack: Vec::new(),
        members: BTreeSet::new(),
    };
    for node in edges.keys() {
        if !state.indices.contains_key(node.as_str()) {
            visit(&mut state, node);
        }
    }
    state.members
}

/// Propagates reach sets to a fixpoint.
#[allow(clippy::type_complexity)]
fn transitive_closure(
    internal_edges: &BTreeMap<String, BTreeSet<String>>,
    external_edges: &BTreeMap<String, BTreeSet<String>>,
) -> (
    BTreeMap<String, BTreeSet<String>>,
    BTreeMap<String, BTreeSet<String>>,
) {
    let mut internal = internal_edges.clone();
    let mut external = external_edges.clone();
    loop {
        let mut changed = false;
        let paths: Vec<String> = internal.keys().cloned().collect();
        for path in &paths {
            let targets: Vec<String> = internal[path].iter().cloned().collect();
            for target in targets {
                let (add_internal, add_external) = (
                    internal.get(&target).cloned().unwrap_or_default(),
                    external.get(&target).cloned().unwrap_or_default(),
                );
                let own_internal = internal.get_mut(path).expect("path is a key");
                let before = own_internal.len();
                own_internal.extend(add_internal);
                changed |= own_internal.len() != before;

                let own_external = external.get_mut(path).expect("path is a key");
                let before = own_external.len();
                own_external.extend(add_external);
                changed |= own_external.len() != before;
            }
        }
        if !changed {
            return (internal, external);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{Package, TreeEntry};

    /// A path with a dotless first segment belongs to the standard
    /// library for these tests.
    fn is_standard(path: &str) -> bool {
        !path.split('/').next().unwrap_or_default().contains('.')
    }

    fn tree(packages: &[(&str, &[&str])]) -> PackageTree {
        let mut tree = PackageTree::new("example.com/p");
        for (path, imports) in packages {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            tree.insert(
                path.to_string(),
                TreeEntry::Package(Package::new(name).with_imports(imports.iter().copied())),
            );
        }
        tree
    }

    fn query() -> ReachQuery<'static> {
        ReachQuery {
            roots: None,
            include_tests: false,
            backprop: true,
            strict_cycles: true,
        }
    }

    #[rstest]
    fn computes_internal_and_external_reach() {
        let tree = tree(&[
            (
                "example.com/p",
                &["example.com/p/a", "host.test/dep/x"][..],
            ),
            ("example.com/p/a", &["example.com/p/b", "fmt"][..]),
            ("example.com/p/b", &["host.test/dep/y"][..]),
        ]);
        let map = tree.reach(&query(), &IgnoreSet::default(), &is_standard);

        let root = map.entry("example.com/p").expect("root entry");
        assert_eq!(root.internal, ["example.com/p/a", "example.com/p/b"]);
        assert_eq!(root.external, ["host.test/dep/x", "host.test/dep/y"]);

        // The standard library never appears in external reach.
        assert!(!root.external.contains(&"fmt".to_string()));
        assert_eq!(
            map.external_union(),
            ["host.test/dep/x", "host.test/dep/y"]
        );
    }

    #[rstest]
    fn ignoring_a_path_removes_it_as_if_unimported() {
        let tree = tree(&[
            (
                "example.com/p",
                &["example.com/p/a", "host.test/dep/x"][..],
            ),
            ("example.com/p/a", &["host.test/dep/y"][..]),
        ]);
        let ignore = IgnoreSet::new(["example.com/p/a".to_string()]);
        let map = tree.reach(&query(), &ignore, &is_standard);

        let root = map.entry("example.com/p").expect("root entry");
        assert!(root.internal.is_empty());
        assert_eq!(root.external, ["host.test/dep/x"]);
    }

    #[rstest]
    fn prefix_patterns_ignore_whole_subtrees() {
        let tree = tree(&[
            ("example.com/p", &["host.test/dep/x", "host.test/gen/a"][..]),
        ]);
        let ignore = IgnoreSet::new(["host.test/gen/*".to_string()]);
        let map = tree.reach(&query(), &ignore, &is_standard);
        assert_eq!(map.external_union(), ["host.test/dep/x"]);
    }

    #[rstest]
    fn backprop_poisons_importers_of_error_packages() {
        let mut tree = tree(&[
            ("example.com/p", &["example.com/p/mid"][..]),
            ("example.com/p/mid", &["example.com/p/bad"][..]),
            ("example.com/p/ok", &[][..]),
        ]);
        tree.insert(
            "example.com/p/bad".to_string(),
            TreeEntry::Error(PackageError::NoSourceFiles),
        );

        let map = tree.reach(&query(), &IgnoreSet::default(), &is_standard);
        assert!(map.entry("example.com/p").is_none());
        assert!(map.entry("example.com/p/mid").is_none());
        assert!(map.entry("example.com/p/ok").is_some());
        assert_eq!(map.errors().len(), 3);
        assert_eq!(
            map.errors().get("example.com/p"),
            Some(&PackageError::NoSourceFiles)
        );
    }

    #[rstest]
    fn without_backprop_importers_keep_their_entries() {
        let mut tree = tree(&[("example.com/p", &["example.com/p/bad"][..])]);
        tree.insert(
            "example.com/p/bad".to_string(),
            TreeEntry::Error(PackageError::NoSourceFiles),
        );

        let mut query = query();
        query.backprop = false;
        let map = tree.reach(&query, &IgnoreSet::default(), &is_standard);
        let root = map.entry("example.com/p").expect("root entry");
        assert!(root.internal.is_empty());
        assert_eq!(map.errors().len(), 1);
    }

    #[rstest]
    fn strict_cycles_drop_participants() {
        let tree = tree(&[
            ("example.com/p", &["example.com/p/a"][..]),
            ("example.com/p/a", &["example.com/p/b"][..]),
            ("example.com/p/b", &["example.com/p/a"][..]),
        ]);
        let map = tree.reach(&query(), &IgnoreSet::default(), &is_standard);
        assert!(map.entry("example.com/p/a").is_none());
        assert!(map.entry("example.com/p/b").is_none());
        // The importer of a cycle keeps its entry; the cycle members
        // simply contribute nothing.
        assert!(map.entry("example.com/p").is_some());
    }

    #[rstest]
    fn lenient_cycles_share_reach() {
        let tree = tree(&[
            ("example.com/p/a", &["example.com/p/b", "host.test/x"][..]),
            ("example.com/p/b", &["example.com/p/a", "host.test/y"][..]),
        ]);
        let mut query = query();
        query.strict_cycles = false;
        let map = tree.reach(&query, &IgnoreSet::default(), &is_standard);
        let a = map.entry("example.com/p/a").expect("entry for a");
        assert_eq!(a.external, ["host.test/x", "host.test/y"]);
        let b = map.entry("example.com/p/b").expect("entry for b");
        assert_eq!(b.external, ["host.test/x", "host.test/y"]);
    }

    #[rstest]
    fn reach_is_idempotent() {
        let tree = tree(&[
            ("example.com/p", &["example.com/p/a"][..]),
            ("example.com/p/a", &["host.test/dep/x"][..]),
        ]);
        let first = tree.reach(&query(), &IgnoreSet::default(), &is_standard);
        let second = tree.reach(&query(), &IgnoreSet::default(), &is_standard);
        assert_eq!(first, second);
        assert_eq!(first.external_union(), second.external_union());
    }

    #[rstest]
    fn root_set_restricts_reported_entries() {
        let tree = tree(&[
            ("example.com/p", &["host.test/dep/x"][..]),
            ("example.com/p/extra", &["host.test/dep/y"][..]),
        ]);
        let roots = ["example.com/p".to_string()];
        let mut query = query();
        query.roots = Some(&roots);
        let map = tree.reach(&query, &IgnoreSet::default(), &is_standard);
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.external_union(), ["host.test/dep/x"]);
    }

    #[rstest]
    fn test_imports_participate_on_request() {
        let mut tree = PackageTree::new("example.com/p");
        tree.insert(
            "example.com/p".to_string(),
            TreeEntry::Package(
                Package::new("p")
                    .with_imports(["host.test/dep/x"])
                    .with_test_imports(["host.test/check"]),
            ),
        );
        let map = tree.reach(&query(), &IgnoreSet::default(), &is_standard);
        assert_eq!(map.external_union(), ["host.test/dep/x"]);

        let mut with_tests = query();
        with_tests.include_tests = true;
        let map = tree.reach(&with_tests, &IgnoreSet::default(), &is_standard);
        assert_eq!(map.external_union(), ["host.test/check", "host.test/dep/x"]);
    }
}
