//! Error types for revcache
//!
//! All modules use `RevcacheResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::vcs::RevisionId;

/// Result type alias for revcache operations
pub type RevcacheResult<T> = Result<T, RevcacheError>;

/// Why no cache could be handed back for a revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoCacheDetail {
    /// Only the exact revision was considered and it has no archive
    NoExactMatch,
    /// The ancestor search found nothing at all
    NoArchives,
    /// Ancestors have archives but the policy forbids picking one
    AncestorsFound(Vec<RevisionId>),
}

impl fmt::Display for NoCacheDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExactMatch => write!(f, "no archive for this exact revision"),
            Self::NoArchives => write!(f, "no archives available for it or any ancestor"),
            Self::AncestorsFound(candidates) => {
                write!(f, "archives exist for ancestor(s): ")?;
                for (i, rev) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", rev)?;
                }
                Ok(())
            }
        }
    }
}

/// All errors that can occur in revcache
#[derive(Error, Debug)]
pub enum RevcacheError {
    // Lookup errors
    #[error("No cache found at {0}")]
    NotFound(String),

    #[error("Transfer from {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Transfer from {url} ended early: got {received} of {expected} bytes")]
    Incomplete {
        url: String,
        received: u64,
        expected: u64,
    },

    #[error("No {subject} cache available for {revision}: {detail}")]
    NoCacheAvailable {
        subject: String,
        revision: RevisionId,
        detail: NoCacheDetail,
    },

    #[error("Archive already cached for {0}")]
    AlreadyCached(RevisionId),

    // VCS errors
    #[error("Unknown or ambiguous revision: {0}")]
    AmbiguousRevision(String),

    #[error("Working tree at {0} has uncommitted changes")]
    DirtyWorktree(PathBuf),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Unknown fallback policy '{0}'. Valid: none, show, download-first, download-all")]
    InvalidPolicy(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RevcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a git error from a failed invocation
    pub fn git(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Whether this error only means "no cache here" during a search
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Transport { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoCacheAvailable {
                detail: NoCacheDetail::AncestorsFound(candidates),
                ..
            } => candidates.first().map(|rev| {
                format!(
                    "Re-run pinned to the closest one: revcache get {}",
                    rev
                )
            }),
            Self::NoCacheAvailable {
                detail: NoCacheDetail::NoExactMatch,
                ..
            } => Some("Try --fallback download-first to use an ancestor's archive".to_string()),
            Self::DirtyWorktree(_) => {
                Some("Commit or stash your changes, or pass --force".to_string())
            }
            Self::AlreadyCached(_) => Some("Pass --force to replace it".to_string()),
            _ => None,
        }
    }
}
