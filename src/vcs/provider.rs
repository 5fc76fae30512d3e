//! Ancestry provider abstraction
//!
//! Implemented by [`GitProvider`](crate::vcs::GitProvider) for real
//! repositories and [`InMemoryHistory`](crate::vcs::InMemoryHistory) for
//! explicit commit graphs.

use crate::error::RevcacheResult;
use crate::vcs::revision::RevisionId;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// A one-shot stream of revision ids in topological order
pub type RevisionStream = BoxStream<'static, RevcacheResult<RevisionId>>;

/// Source of commit ancestry
#[async_trait]
pub trait AncestryProvider: Send + Sync {
    /// Stream the commits reachable from `start`, minus everything reachable
    /// from any commit in `exclude`.
    ///
    /// Children are always produced before their parents. The stream cannot
    /// be re-parameterised once opened; dropping it abandons the query.
    async fn ancestors(
        &self,
        start: &RevisionId,
        exclude: &[RevisionId],
    ) -> RevcacheResult<RevisionStream>;

    /// Resolve a short or symbolic name to a full revision id
    async fn resolve(&self, partial: &str) -> RevcacheResult<RevisionId>;
}
