//! revcache - Revision-keyed artifact cache
//!
//! Finds the prebuilt archive for a VCS revision locally or on a remote
//! mirror, and when the revision itself was never built, the archives of
//! its closest cached ancestors.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ui;
pub mod vcs;

pub use error::{RevcacheError, RevcacheResult};
