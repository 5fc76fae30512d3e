//! Local archive storage
//!
//! One archive per revision at `<root>/<revision>.<ext>`. The presence of
//! that file is the only existence signal. Files only ever appear through
//! a temp-file-then-rename write, so a reader never observes a partial
//! archive.

use crate::error::{RevcacheError, RevcacheResult};
use crate::vcs::RevisionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix for in-flight downloads; never matches a revision file name
const TEMP_PREFIX: &str = ".revcache-";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// An archive found in storage
#[derive(Debug, Clone, Serialize)]
pub struct StoredArchive {
    pub revision: RevisionId,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Storage root plus archive naming convention
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
    archive_ext: String,
}

impl CacheStorage {
    /// Create a storage handle. `archive_ext` may be given with or without
    /// its leading dot.
    pub fn new(root: impl Into<PathBuf>, archive_ext: &str) -> Self {
        Self {
            root: root.into(),
            archive_ext: archive_ext.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_ext(&self) -> &str {
        &self.archive_ext
    }

    /// Archive file name for a revision, shared by local and remote layouts
    pub fn file_name(&self, revision: &RevisionId) -> String {
        format!("{}.{}", revision, self.archive_ext)
    }

    /// Conventional local path for a revision's archive
    pub fn path_for(&self, revision: &RevisionId) -> PathBuf {
        self.root.join(self.file_name(revision))
    }

    /// Whether an archive for `revision` is present
    pub fn contains(&self, revision: &RevisionId) -> bool {
        self.path_for(revision).is_file()
    }

    /// Create the storage root if needed
    pub fn ensure_root(&self) -> RevcacheResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            RevcacheError::io(format!("creating storage directory {}", self.root.display()), e)
        })
    }

    /// Archives currently in storage, newest first
    pub fn list(&self) -> RevcacheResult<Vec<StoredArchive>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RevcacheError::io(
                    format!("reading storage directory {}", self.root.display()),
                    e,
                ))
            }
        };

        let suffix = format!(".{}", self.archive_ext);
        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RevcacheError::io("reading storage entry", e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let Some(revision) = name.strip_suffix(&suffix) else {
                continue;
            };

            let metadata = entry
                .metadata()
                .map_err(|e| RevcacheError::io(format!("reading metadata of {}", name), e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            archives.push(StoredArchive {
                revision: RevisionId::new(revision),
                path: entry.path(),
                size_bytes: metadata.len(),
                modified,
            });
        }

        archives.sort_by(|a, b| b.modified.cmp(&a.modified));
        debug!("Found {} archives in {}", archives.len(), self.root.display());
        Ok(archives)
    }

    /// Copy an externally produced archive into storage for `revision`.
    ///
    /// Refuses to replace an existing archive unless `force` is set.
    pub fn store(&self, revision: &RevisionId, source: &Path, force: bool) -> RevcacheResult<PathBuf> {
        if self.contains(revision) && !force {
            return Err(RevcacheError::AlreadyCached(revision.clone()));
        }

        let mut reader = File::open(source)
            .map_err(|e| RevcacheError::io(format!("opening {}", source.display()), e))?;
        self.atomic_write_with(revision, |file| {
            io::copy(&mut reader, file)
                .map_err(|e| RevcacheError::io(format!("copying {}", source.display()), e))?;
            Ok(())
        })
    }

    /// Write an archive through a temp file in the storage root, then
    /// rename it into place. On any failure the temp file is removed and
    /// nothing appears at the final path.
    pub(crate) fn atomic_write_with(
        &self,
        revision: &RevisionId,
        write: impl FnOnce(&mut File) -> RevcacheResult<()>,
    ) -> RevcacheResult<PathBuf> {
        self.ensure_root()?;
        let dest = self.path_for(revision);

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.root)
            .map_err(|e| RevcacheError::io("creating temporary archive", e))?;

        write(tmp.as_file_mut())?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| RevcacheError::io("syncing temporary archive", e))?;

        tmp.persist(&dest).map_err(|e| {
            RevcacheError::io(format!("moving archive into {}", dest.display()), e.error)
        })?;

        debug!("Wrote {}", dest.display());
        Ok(dest)
    }
}
