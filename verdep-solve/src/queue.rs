//! The unselected queue and per-project version queues.

use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

use verdep_source::SolveBridge;
use verdep_types::{ProjectIdentifier, ProjectRoot, Version};

use crate::{Error, SolveFailure};

/// One `(identifier, required-packages)` demand waiting to be selected.
#[derive(Clone, Debug)]
pub(crate) struct BimodalItem {
    pub(crate) ident: ProjectIdentifier,
    pub(crate) packages: Vec<String>,
    rank: u8,
    seq: u64,
}

impl PartialEq for BimodalItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BimodalItem {}

impl PartialOrd for BimodalItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BimodalItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.ident.root().cmp(other.ident.root()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// The priority queue of projects that still need a selection.
///
/// Priority is stable: the root project first, then projects whose locked
/// version is being preserved, then everything else alphabetically by
/// project root. Items with equal priority pop in insertion order.
#[derive(Debug)]
pub(crate) struct UnselectedQueue {
    items: BTreeSet<BimodalItem>,
    root: ProjectRoot,
    lock_preserved: BTreeSet<ProjectRoot>,
    seq: u64,
}

impl UnselectedQueue {
    /// Creates an empty queue.
    ///
    /// `lock_preserved` holds the roots whose lock entry is eligible for
    /// preservation; they sort ahead of unlocked projects.
    pub(crate) fn new(root: ProjectRoot, lock_preserved: BTreeSet<ProjectRoot>) -> Self {
        Self {
            items: BTreeSet::new(),
            root,
            lock_preserved,
            seq: 0,
        }
    }

    /// Enqueues a demand.
    pub(crate) fn push(&mut self, ident: ProjectIdentifier, packages: Vec<String>) {
        let rank = if ident.root() == &self.root {
            0
        } else if self.lock_preserved.contains(ident.root()) {
            1
        } else {
            2
        };
        let item = BimodalItem {
            ident,
            packages,
            rank,
            seq: self.seq,
        };
        self.seq += 1;
        self.items.insert(item);
    }

    /// Removes and returns the highest-priority demand.
    pub(crate) fn pop(&mut self) -> Option<BimodalItem> {
        self.items.pop_first()
    }

    /// Removes every demand for `root`.
    pub(crate) fn remove_all(&mut self, root: &ProjectRoot) {
        self.items.retain(|item| item.ident.root() != root);
    }
}

/// Iteration state over one project's candidate versions.
///
/// A queue starts at the lock-preferred version when one is given and
/// falls back to the bridge's sorted list once advanced past it. The
/// failures that rejected each candidate accumulate for ancestor blame
/// and for the aggregate failure should the queue exhaust.
#[derive(Debug)]
pub(crate) struct VersionQueue {
    pub(crate) ident: ProjectIdentifier,
    preferred: Option<Version>,
    preferred_active: bool,
    versions: Option<Arc<Vec<Version>>>,
    index: usize,
    pub(crate) failed: bool,
    pub(crate) fails: Vec<(Version, SolveFailure)>,
}

impl VersionQueue {
    /// Creates a queue that offers the lock-preferred version first.
    pub(crate) fn with_preferred(ident: ProjectIdentifier, preferred: Version) -> Self {
        Self {
            ident,
            preferred: Some(preferred),
            preferred_active: true,
            versions: None,
            index: 0,
            failed: false,
            fails: Vec::new(),
        }
    }

    /// Creates a queue over the bridge's sorted version list.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the list fetch.
    pub(crate) fn from_bridge(
        ident: ProjectIdentifier,
        bridge: &SolveBridge,
    ) -> Result<Self, Error> {
        let versions = bridge.list_versions(&ident)?;
        Ok(Self {
            ident,
            preferred: None,
            preferred_active: false,
            versions: Some(versions),
            index: 0,
            failed: false,
            fails: Vec::new(),
        })
    }

    /// Returns the candidate currently offered, if any.
    pub(crate) fn current(&self) -> Option<&Version> {
        if self.preferred_active {
            return self.preferred.as_ref();
        }
        self.versions
            .as_ref()
            .and_then(|versions| versions.get(self.index))
    }

    /// Advances past the current candidate.
    ///
    /// Leaving the lock-preferred head loads the sorted list from the
    /// bridge. Versions equal to the already-tried preferred head are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the list fetch.
    pub(crate) fn advance(&mut self, bridge: &SolveBridge) -> Result<(), Error> {
        if self.preferred_active {
            self.preferred_active = false;
            if self.versions.is_none() {
                self.versions = Some(bridge.list_versions(&self.ident)?);
            }
            self.index = 0;
        } else {
            self.index += 1;
        }
        if let Some(preferred) = &self.preferred {
            while self
                .versions
                .as_ref()
                .and_then(|versions| versions.get(self.index))
                .is_some_and(|version| version == preferred || version.matches(preferred))
            {
                self.index += 1;
            }
        }
        Ok(())
    }

    /// Records a failure against a candidate.
    pub(crate) fn record_failure(&mut self, version: Version, failure: SolveFailure) {
        self.fails.push((version, failure));
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn ident(root: &str) -> ProjectIdentifier {
        root.parse().unwrap()
    }

    #[rstest]
    fn pop_order_is_root_lock_alpha_insertion() -> TestResult {
        let lock_preserved = BTreeSet::from(["example.com/locked".parse::<ProjectRoot>()?]);
        let mut queue = UnselectedQueue::new("example.com/r".parse()?, lock_preserved);

        queue.push(ident("example.com/zeta"), vec![]);
        queue.push(ident("example.com/alpha"), vec![]);
        queue.push(ident("example.com/locked"), vec![]);
        queue.push(ident("example.com/r"), vec![]);
        queue.push(ident("example.com/alpha"), vec!["pkg".to_string()]);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|item| format!("{}/{}", item.ident.root(), item.packages.len()))
            .collect();
        assert_eq!(
            order,
            [
                "example.com/r/0",
                "example.com/locked/0",
                "example.com/alpha/0",
                "example.com/alpha/1",
                "example.com/zeta/0",
            ]
        );
        Ok(())
    }

    #[rstest]
    fn remove_all_drops_every_demand_for_a_root() -> TestResult {
        let mut queue = UnselectedQueue::new("example.com/r".parse()?, BTreeSet::new());
        queue.push(ident("example.com/a"), vec![]);
        queue.push(ident("example.com/a"), vec!["pkg".to_string()]);
        queue.push(ident("example.com/b"), vec![]);
        queue.remove_all(&"example.com/a".parse()?);
        assert_eq!(queue.pop().map(|item| item.ident), Some(ident("example.com/b")));
        assert!(queue.pop().is_none());
        Ok(())
    }
}
