//! Fallback policies for revisions without an exact cache

use crate::error::RevcacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when the requested revision has no archive of its own
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Only accept an exact match
    None,
    /// Search ancestors and report what exists, but download nothing
    #[default]
    Show,
    /// Download the closest cached ancestor
    DownloadFirst,
    /// Download every closest cached ancestor and use the nearest.
    ///
    /// The farther archives stay in storage so later lookups for nearby
    /// revisions resolve locally.
    DownloadAll,
}

impl FallbackPolicy {
    /// Token used on the command line and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Show => "show",
            Self::DownloadFirst => "download-first",
            Self::DownloadAll => "download-all",
        }
    }

    /// Whether the ancestor search runs at all
    pub fn searches_ancestors(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackPolicy {
    type Err = RevcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "show" => Ok(Self::Show),
            "download-first" => Ok(Self::DownloadFirst),
            "download-all" => Ok(Self::DownloadAll),
            other => Err(RevcacheError::InvalidPolicy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for policy in [
            FallbackPolicy::None,
            FallbackPolicy::Show,
            FallbackPolicy::DownloadFirst,
            FallbackPolicy::DownloadAll,
        ] {
            assert_eq!(policy.as_str().parse::<FallbackPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn unknown_token_rejected() {
        assert!(matches!(
            "download-some".parse::<FallbackPolicy>(),
            Err(RevcacheError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn serde_uses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            fallback: FallbackPolicy,
        }
        let w: Wrapper = toml::from_str(r#"fallback = "download-all""#).unwrap();
        assert_eq!(w.fallback, FallbackPolicy::DownloadAll);
    }

    #[test]
    fn only_none_skips_search() {
        assert!(!FallbackPolicy::None.searches_ancestors());
        assert!(FallbackPolicy::Show.searches_ancestors());
    }
}
