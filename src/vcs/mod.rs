//! Version-control ancestry
//!
//! Everything revcache needs from a VCS is a topological ancestry query
//! with an exclusion set, plus resolving user-supplied revision names.
//! [`AncestorVisitor`] layers a prunable walk on top of that one-shot query.

pub mod git;
pub mod memory;
pub mod provider;
pub mod revision;
pub mod visitor;

pub use git::GitProvider;
pub use memory::InMemoryHistory;
pub use provider::{AncestryProvider, RevisionStream};
pub use revision::RevisionId;
pub use visitor::{AncestorVisitor, PruneToken, Visit};
