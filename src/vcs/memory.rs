//! In-memory commit graph
//!
//! Answers ancestry queries over an explicit parent map with the same
//! contract as `git rev-list --topo-order`: children before parents, parents
//! of a merge explored starting from the last-listed one.

use crate::error::{RevcacheError, RevcacheResult};
use crate::vcs::provider::{AncestryProvider, RevisionStream};
use crate::vcs::revision::RevisionId;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A commit graph held in memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    parents: HashMap<RevisionId, Vec<RevisionId>>,
    queries: AtomicUsize,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit with its parents (builder form)
    pub fn with_commit(mut self, id: &str, parents: &[&str]) -> Self {
        self.add_commit(id, parents);
        self
    }

    /// Add a commit with its parents. Parents need not be added first.
    pub fn add_commit(&mut self, id: &str, parents: &[&str]) {
        self.parents.insert(
            RevisionId::new(id),
            parents.iter().map(|p| RevisionId::new(*p)).collect(),
        );
    }

    /// Number of ancestry queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn parents_of(&self, rev: &RevisionId) -> &[RevisionId] {
        self.parents.get(rev).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All commits reachable from `roots`, roots included
    fn reachable<'a>(&self, roots: impl IntoIterator<Item = &'a RevisionId>) -> HashSet<RevisionId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<RevisionId> = roots.into_iter().cloned().collect();
        while let Some(rev) = stack.pop() {
            if seen.insert(rev.clone()) {
                stack.extend(self.parents_of(&rev).iter().cloned());
            }
        }
        seen
    }

    /// Topological order of `start`'s ancestry minus that of `exclude`
    fn topo_order(&self, start: &RevisionId, exclude: &[RevisionId]) -> Vec<RevisionId> {
        let excluded = self.reachable(exclude);
        if excluded.contains(start) {
            return Vec::new();
        }

        let included: HashSet<RevisionId> = self
            .reachable([start])
            .into_iter()
            .filter(|rev| !excluded.contains(rev))
            .collect();

        let mut pending_children: HashMap<&RevisionId, usize> = HashMap::new();
        for rev in &included {
            for parent in self.parents_of(rev) {
                if included.contains(parent) {
                    *pending_children.entry(parent).or_default() += 1;
                }
            }
        }

        let mut order = Vec::with_capacity(included.len());
        let mut ready = vec![start.clone()];
        while let Some(rev) = ready.pop() {
            for parent in self.parents_of(&rev) {
                if let Some(count) = pending_children.get_mut(parent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(parent.clone());
                    }
                }
            }
            order.push(rev);
        }
        order
    }
}

#[async_trait]
impl AncestryProvider for InMemoryHistory {
    async fn ancestors(
        &self,
        start: &RevisionId,
        exclude: &[RevisionId],
    ) -> RevcacheResult<RevisionStream> {
        if !self.parents.contains_key(start) {
            return Err(RevcacheError::AmbiguousRevision(start.to_string()));
        }
        self.queries.fetch_add(1, Ordering::SeqCst);
        let order = self.topo_order(start, exclude);
        Ok(stream::iter(order.into_iter().map(Ok)).boxed())
    }

    async fn resolve(&self, partial: &str) -> RevcacheResult<RevisionId> {
        let mut matches = self
            .parents
            .keys()
            .filter(|rev| rev.as_str().starts_with(partial));
        match (matches.next(), matches.next()) {
            (Some(rev), None) if !partial.is_empty() => Ok(rev.clone()),
            _ => Err(RevcacheError::AmbiguousRevision(partial.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    /// ```text
    /// A -- B -- E -- I -- J -- L
    ///       \       /    /
    ///        C --- F -- H
    ///         \        /
    ///          D ---- G --- K
    /// ```
    pub(crate) fn sample_history() -> InMemoryHistory {
        InMemoryHistory::new()
            .with_commit("A", &[])
            .with_commit("B", &["A"])
            .with_commit("C", &["B"])
            .with_commit("D", &["C"])
            .with_commit("E", &["B"])
            .with_commit("F", &["C"])
            .with_commit("G", &["D"])
            .with_commit("I", &["E", "F"])
            .with_commit("H", &["F", "G"])
            .with_commit("J", &["I", "H"])
            .with_commit("K", &["G"])
            .with_commit("L", &["J"])
    }

    fn ids(order: &[RevisionId]) -> String {
        order.iter().map(RevisionId::as_str).collect()
    }

    #[tokio::test]
    async fn full_history_in_topo_order() {
        let history = sample_history();
        let order: Vec<_> = history
            .ancestors(&"L".into(), &[])
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids(&order), "LJHGDIFCEBA");
    }

    #[tokio::test]
    async fn exclusion_removes_all_ancestors() {
        let history = sample_history();
        let order: Vec<_> = history
            .ancestors(&"L".into(), &["G".into()])
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        // B is reachable through E but is an ancestor of G
        assert_eq!(ids(&order), "LJHIFE");
    }

    #[tokio::test]
    async fn excluding_start_is_empty() {
        let history = sample_history();
        let order: Vec<_> = history
            .ancestors(&"L".into(), &["L".into()])
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(order.is_empty());
    }

    #[tokio::test]
    async fn unknown_start_is_an_error() {
        let history = sample_history();
        assert!(history.ancestors(&"Z".into(), &[]).await.is_err());
        assert_eq!(history.query_count(), 0);
    }

    #[tokio::test]
    async fn resolve_prefix() {
        let history = InMemoryHistory::new()
            .with_commit("abc123", &[])
            .with_commit("abd456", &["abc123"]);
        assert_eq!(history.resolve("abc").await.unwrap().as_str(), "abc123");
        assert!(matches!(
            history.resolve("ab").await,
            Err(RevcacheError::AmbiguousRevision(_))
        ));
        assert!(history.resolve("zzz").await.is_err());
    }
}
