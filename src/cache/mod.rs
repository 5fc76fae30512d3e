//! Revision-keyed archive cache
//!
//! Archives are stored one per revision, locally under a storage root and
//! optionally on a remote mirror using the same file names. When the
//! requested revision has no archive, the closest cached ancestors are
//! found by walking the VCS history.
//!
//! # Lookup order
//!
//! | Step | Source | Notes |
//! |------|--------|-------|
//! | 1 | Local storage | Skipped with `--force-download` |
//! | 2 | Remote mirror | Connection held open until used or released |
//! | 3 | Ancestors | Only when the fallback policy is not `none` |

pub mod locator;
pub mod policy;
pub mod reference;
pub mod storage;
pub mod transport;

pub use locator::{CacheLocator, DEFAULT_JOBS};
pub use policy::FallbackPolicy;
pub use reference::{CacheReference, CandidateSet, LocalCache, RemoteCache};
pub use storage::{format_bytes, CacheStorage, StoredArchive};
pub use transport::{normalize_base_url, HttpTransport, RemoteStream, Transport};
