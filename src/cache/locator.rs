//! Cache discovery and fallback resolution
//!
//! [`CacheLocator`] answers "which archive should be unpacked for this
//! revision?". It tries the exact revision first (local storage, then the
//! remote), and otherwise walks the ancestry, pruning below every commit
//! that has an archive: an archive further back can only be a worse match.
//! The [`FallbackPolicy`] then decides what to materialize.
//!
//! Every remote connection opened during a lookup is owned by a
//! [`CandidateSet`] or by the single reference being materialized, so none
//! outlives the call on any path.

use crate::cache::policy::FallbackPolicy;
use crate::cache::reference::{CacheReference, CandidateSet, LocalCache, RemoteCache};
use crate::cache::storage::CacheStorage;
use crate::cache::transport::{normalize_base_url, HttpTransport, Transport};
use crate::error::{NoCacheDetail, RevcacheError, RevcacheResult};
use crate::ui::DownloadProgress;
use crate::vcs::{AncestorVisitor, AncestryProvider, RevisionId, Visit};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default bound on concurrent downloads under [`FallbackPolicy::DownloadAll`]
pub const DEFAULT_JOBS: usize = 4;

/// Locates archives for revisions of one subject (e.g. a dependency)
pub struct CacheLocator {
    subject: String,
    vcs: Arc<dyn AncestryProvider>,
    transport: Arc<dyn Transport>,
    remote_base_url: Option<String>,
    storage: CacheStorage,
    force_download: bool,
    jobs: usize,
    progress: DownloadProgress,
}

impl CacheLocator {
    /// Locator with no remote, HTTP transport and hidden progress
    pub fn new(
        subject: impl Into<String>,
        vcs: Arc<dyn AncestryProvider>,
        storage: CacheStorage,
    ) -> Self {
        Self {
            subject: subject.into(),
            vcs,
            transport: Arc::new(HttpTransport::new()),
            remote_base_url: None,
            storage,
            force_download: false,
            jobs: DEFAULT_JOBS,
            progress: DownloadProgress::hidden(),
        }
    }

    /// Fetch missing archives from `base_url`
    pub fn with_remote(mut self, base_url: Option<&str>) -> Self {
        self.remote_base_url = base_url.map(normalize_base_url);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Skip local storage and always go to the remote
    pub fn with_force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    /// Bound concurrent downloads (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_progress(mut self, progress: DownloadProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// The archive for exactly `revision`, if any.
    ///
    /// Local storage wins unless downloads are forced. Absence and remote
    /// failures are both reported as `None`.
    pub async fn find_exact(&self, revision: &RevisionId) -> Option<CacheReference> {
        if !self.force_download {
            match LocalCache::open(&self.storage, revision.clone()) {
                Ok(local) => {
                    debug!("Found local {} archive for {}", self.subject, revision.short());
                    return Some(CacheReference::Local(local));
                }
                Err(e) => debug!("No local archive: {}", e),
            }
        }

        let base_url = self.remote_base_url.clone()?;
        let transport = Arc::clone(&self.transport);
        let storage = self.storage.clone();
        let rev = revision.clone();
        let opened = tokio::task::spawn_blocking(move || {
            RemoteCache::open(&*transport, &base_url, &storage, rev)
        })
        .await;

        match opened {
            Ok(Ok(remote)) => {
                debug!("Found remote {} archive at {}", self.subject, remote.url());
                Some(CacheReference::Remote(remote))
            }
            Ok(Err(e)) if e.is_miss() => {
                debug!("No remote archive: {}", e);
                None
            }
            Ok(Err(e)) => {
                warn!("Remote lookup for {} failed: {}", revision.short(), e);
                None
            }
            Err(e) => {
                warn!("Remote lookup task for {} failed: {}", revision.short(), e);
                None
            }
        }
    }

    /// Archives for the closest cached ancestors of `revision` (itself
    /// included), closest first. Dropping the set releases any connection
    /// that was not taken out of it.
    pub async fn find_all(&self, revision: &RevisionId) -> RevcacheResult<CandidateSet> {
        self.search(revision, false).await
    }

    /// Resolve `revision` to a local archive, falling back to ancestors
    /// according to `policy`.
    pub async fn find_local_with_fallback(
        &self,
        revision: &RevisionId,
        policy: FallbackPolicy,
    ) -> RevcacheResult<LocalCache> {
        if let Some(exact) = self.find_exact(revision).await {
            info!("Using {} archive for {}", self.subject, revision.short());
            return self.materialize(exact).await;
        }

        if !policy.searches_ancestors() {
            return Err(self.unavailable(revision, NoCacheDetail::NoExactMatch));
        }

        let mut candidates = self.search(revision, true).await?;
        if candidates.is_empty() {
            return Err(self.unavailable(revision, NoCacheDetail::NoArchives));
        }

        info!(
            "Found {} cached ancestor(s) of {}: {}",
            candidates.len(),
            revision.short(),
            candidates
                .revisions()
                .iter()
                .map(RevisionId::short)
                .collect::<Vec<_>>()
                .join(", ")
        );

        match policy {
            FallbackPolicy::None | FallbackPolicy::Show => {
                let found = candidates.revisions();
                candidates.release_all();
                Err(self.unavailable(revision, NoCacheDetail::AncestorsFound(found)))
            }
            FallbackPolicy::DownloadFirst => {
                let first = candidates
                    .take_first()
                    .ok_or_else(|| RevcacheError::Internal("candidate set emptied".into()))?;
                candidates.release_all();
                self.materialize(first).await
            }
            FallbackPolicy::DownloadAll => self.materialize_all(candidates.take_all()).await,
        }
    }

    /// Walk the ancestry of `revision`, collecting one reference per
    /// closest cached commit. With `skip_start`, the starting commit is
    /// walked through without a lookup (the caller already tried it).
    async fn search(&self, revision: &RevisionId, skip_start: bool) -> RevcacheResult<CandidateSet> {
        let mut candidates = CandidateSet::new();
        let mut visitor = AncestorVisitor::new(&*self.vcs, revision.clone());
        let mut looked_up = 0usize;

        while let Some(Visit { revision: rev, prune }) = visitor.next().await? {
            if skip_start && rev == *revision {
                continue;
            }
            looked_up += 1;
            match self.find_exact(&rev).await {
                Some(found) => {
                    debug!("Cached ancestor {}; pruning its history", rev.short());
                    candidates.push(found);
                    prune.prune();
                }
                None => debug!("No archive for {}", rev.short()),
            }
        }

        debug!(
            "Ancestor search from {} checked {} commits, {} restarts, {} candidates",
            revision.short(),
            looked_up,
            visitor.restarts(),
            candidates.len()
        );
        Ok(candidates)
    }

    /// Download one reference on a blocking worker
    async fn materialize(&self, reference: CacheReference) -> RevcacheResult<LocalCache> {
        let bar = self.progress.bar(reference.revision().short());
        tokio::task::spawn_blocking(move || {
            let result = reference.materialize(&bar);
            bar.finish_and_clear();
            result
        })
        .await
        .map_err(|e| RevcacheError::Internal(format!("download task failed: {}", e)))?
    }

    /// Materialize every reference with at most `jobs` transfers in flight
    /// and return the first (closest) one. All transfers finish before this
    /// returns, so no connection outlives the call.
    ///
    /// Only the closest download decides the outcome; a farther one that
    /// fails is logged and left out of storage.
    async fn materialize_all(&self, references: Vec<CacheReference>) -> RevcacheResult<LocalCache> {
        let revisions: Vec<RevisionId> = references.iter().map(|r| r.revision().clone()).collect();
        let mut results = stream::iter(references)
            .map(|reference| self.materialize(reference))
            .buffered(self.jobs)
            .collect::<Vec<RevcacheResult<LocalCache>>>()
            .await
            .into_iter();

        let closest = results
            .next()
            .ok_or_else(|| RevcacheError::Internal("no references to materialize".into()))?;

        for (rev, result) in revisions.iter().skip(1).zip(results) {
            if let Err(e) = result {
                warn!("Could not pre-fetch archive for {}: {}", rev.short(), e);
            }
        }
        closest
    }

    fn unavailable(&self, revision: &RevisionId, detail: NoCacheDetail) -> RevcacheError {
        RevcacheError::NoCacheAvailable {
            subject: self.subject.clone(),
            revision: revision.clone(),
            detail,
        }
    }
}
