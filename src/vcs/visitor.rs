//! Prunable topological walk over a revision's ancestry
//!
//! The provider's query is one-shot: it cannot take a new exclusion once
//! opened. The visitor therefore keeps an exclusion list and a count of
//! commits already handed out. Each visited commit comes with a
//! [`PruneToken`]; when the caller uses it, the commit joins the exclusion
//! list and the query is reopened, skipping the prefix that was already
//! delivered. Commits that are not pruned just bump the skip count, so a
//! query is only restarted once per prune.

use crate::error::RevcacheResult;
use crate::vcs::provider::{AncestryProvider, RevisionStream};
use crate::vcs::revision::RevisionId;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Single-use capability to cut a visited commit's ancestors from the walk
#[derive(Debug)]
pub struct PruneToken {
    flag: Arc<AtomicBool>,
}

impl PruneToken {
    /// Do not descend into this commit's parents
    ///
    /// Only takes effect before the visitor's next call to `next`; a token
    /// kept past that point no longer affects the walk.
    pub fn prune(self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// One step of the walk
#[derive(Debug)]
pub struct Visit {
    pub revision: RevisionId,
    pub prune: PruneToken,
}

/// Lazy, prunable ancestor traversal
///
/// Not restartable: construct a new visitor to walk again.
pub struct AncestorVisitor<'a> {
    provider: &'a dyn AncestryProvider,
    start: RevisionId,
    excluded: Vec<RevisionId>,
    skip: usize,
    stream: Option<RevisionStream>,
    last: Option<(RevisionId, Arc<AtomicBool>)>,
    exhausted: bool,
    restarts: usize,
}

impl<'a> AncestorVisitor<'a> {
    pub fn new(provider: &'a dyn AncestryProvider, start: RevisionId) -> Self {
        Self {
            provider,
            start,
            excluded: Vec::new(),
            skip: 0,
            stream: None,
            last: None,
            exhausted: false,
            restarts: 0,
        }
    }

    /// How many times the underlying query was reopened after a prune
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Produce the next commit, or `None` once the ancestry is exhausted.
    ///
    /// A commit is always produced before any of its parents.
    pub async fn next(&mut self) -> RevcacheResult<Option<Visit>> {
        if self.exhausted {
            return Ok(None);
        }

        if let Some((rev, flag)) = self.last.take() {
            if flag.load(Ordering::SeqCst) {
                debug!("Pruning ancestors of {}", rev.short());
                self.excluded.push(rev);
                self.stream = None;
                self.restarts += 1;
            } else {
                self.skip += 1;
            }
        }

        if self.stream.is_none() {
            match self.reopen().await? {
                Some(stream) => self.stream = Some(stream),
                None => return Ok(self.finish()),
            }
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(self.finish());
        };

        match stream.next().await {
            Some(rev) => {
                let rev = rev?;
                let flag = Arc::new(AtomicBool::new(false));
                self.last = Some((rev.clone(), Arc::clone(&flag)));
                Ok(Some(Visit {
                    revision: rev,
                    prune: PruneToken { flag },
                }))
            }
            None => Ok(self.finish()),
        }
    }

    /// Open a fresh query and fast-forward past commits already delivered.
    /// Returns `None` when the history ends inside the skipped prefix.
    async fn reopen(&mut self) -> RevcacheResult<Option<RevisionStream>> {
        debug!(
            "Querying ancestors of {} (skip {}, {} excluded)",
            self.start.short(),
            self.skip,
            self.excluded.len()
        );
        let mut stream = self.provider.ancestors(&self.start, &self.excluded).await?;
        for _ in 0..self.skip {
            match stream.next().await {
                Some(rev) => {
                    rev?;
                }
                None => return Ok(None),
            }
        }
        Ok(Some(stream))
    }

    fn finish(&mut self) -> Option<Visit> {
        self.exhausted = true;
        self.stream = None;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::memory::tests::sample_history;
    use std::collections::HashMap;

    /// Walk from `start`, pruning on every commit in `matches`.
    /// Returns (found, visited) as strings of commit names.
    async fn walk(provider: &dyn AncestryProvider, start: &str, matches: &str) -> (String, String) {
        let mut found = String::new();
        let mut visited = String::new();
        let mut visitor = AncestorVisitor::new(provider, start.into());
        while let Some(visit) = visitor.next().await.unwrap() {
            if matches.contains(visit.revision.as_str()) {
                found.push_str(visit.revision.as_str());
                visit.prune.prune();
            } else {
                visited.push_str(visit.revision.as_str());
            }
        }
        (found, visited)
    }

    #[tokio::test]
    async fn unpruned_walk_is_topological() {
        let history = sample_history();
        let (_, visited) = walk(&history, "L", "").await;

        assert_eq!(visited.len(), 11);
        assert!(visited.starts_with('L'));
        assert!(visited.ends_with('A'));

        let position: HashMap<char, usize> =
            visited.chars().enumerate().map(|(i, c)| (c, i)).collect();
        let edges = [
            ('B', 'A'), ('C', 'B'), ('E', 'B'), ('D', 'C'), ('F', 'C'), ('G', 'D'),
            ('I', 'E'), ('I', 'F'), ('H', 'F'), ('H', 'G'), ('J', 'I'), ('J', 'H'),
            ('L', 'J'),
        ];
        for (child, parent) in edges {
            assert!(
                position[&child] < position[&parent],
                "{} visited after its parent {}",
                child,
                parent
            );
        }
    }

    #[tokio::test]
    async fn pruning_the_start_stops_everything() {
        let history = sample_history();
        let (found, visited) = walk(&history, "L", "L").await;
        assert_eq!(found, "L");
        assert_eq!(visited, "");
    }

    #[tokio::test]
    async fn pruning_cuts_shared_ancestors() {
        let history = sample_history();
        let (found, visited) = walk(&history, "L", "BFG").await;

        let mut found: Vec<char> = found.chars().collect();
        found.sort_unstable();
        assert_eq!(found, vec!['F', 'G']);

        let mut visited: Vec<char> = visited.chars().collect();
        visited.sort_unstable();
        assert_eq!(visited, vec!['E', 'H', 'I', 'J', 'L']);
    }

    #[tokio::test]
    async fn pruning_matches_rev_list_order() {
        let history = sample_history();
        assert_eq!(walk(&history, "L", "BFG").await, ("GF".into(), "LJHIE".into()));
    }

    #[tokio::test]
    async fn no_match_visits_every_ancestor_once() {
        let history = sample_history();
        let (found, visited) = walk(&history, "L", "K").await;
        assert_eq!(found, "");
        assert_eq!(visited, "LJHGDIFCEBA");
        assert_eq!(history.query_count(), 1);
    }

    #[tokio::test]
    async fn restarts_once_per_prune() {
        let history = sample_history();
        let mut visitor = AncestorVisitor::new(&history, "L".into());
        while let Some(visit) = visitor.next().await.unwrap() {
            if "FG".contains(visit.revision.as_str()) {
                visit.prune.prune();
            }
        }
        assert_eq!(visitor.restarts(), 2);
        assert_eq!(history.query_count(), 3);
    }

    #[tokio::test]
    async fn late_prune_is_ignored() {
        let history = sample_history();
        let mut visitor = AncestorVisitor::new(&history, "L".into());
        let first = visitor.next().await.unwrap().unwrap();
        let second = visitor.next().await.unwrap().unwrap();
        assert_eq!(second.revision.as_str(), "J");
        first.prune.prune();

        let mut visited = String::from("LJ");
        while let Some(visit) = visitor.next().await.unwrap() {
            visited.push_str(visit.revision.as_str());
        }
        assert_eq!(visited, "LJHGDIFCEBA");
        assert_eq!(visitor.restarts(), 0);
        assert_eq!(history.query_count(), 1);
    }

    #[tokio::test]
    async fn pruning_a_root_commit_is_harmless() {
        let history = sample_history();
        let (found, visited) = walk(&history, "B", "A").await;
        assert_eq!(found, "A");
        assert_eq!(visited, "B");
    }

    #[tokio::test]
    async fn exhausted_visitor_stays_exhausted() {
        let history = sample_history();
        let mut visitor = AncestorVisitor::new(&history, "A".into());
        assert!(visitor.next().await.unwrap().is_some());
        assert!(visitor.next().await.unwrap().is_none());
        assert!(visitor.next().await.unwrap().is_none());
        assert_eq!(history.query_count(), 1);
    }
}
