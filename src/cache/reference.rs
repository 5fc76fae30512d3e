//! Cache references
//!
//! A [`CacheReference`] names *the* archive for one revision, either
//! already in local storage or available remotely with an open connection.
//! A remote reference owns its connection until it is materialized or
//! released; dropping it releases it.

use crate::cache::storage::CacheStorage;
use crate::cache::transport::{RemoteStream, Transport};
use crate::error::{RevcacheError, RevcacheResult};
use crate::vcs::RevisionId;
use indicatif::ProgressBar;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// An archive present in local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCache {
    revision: RevisionId,
    path: PathBuf,
}

impl LocalCache {
    /// Reference the stored archive for `revision`, failing with
    /// [`RevcacheError::NotFound`] when there is none.
    pub fn open(storage: &CacheStorage, revision: RevisionId) -> RevcacheResult<Self> {
        let path = storage.path_for(&revision);
        if !path.is_file() {
            return Err(RevcacheError::NotFound(path.display().to_string()));
        }
        Ok(Self { revision, path })
    }

    pub fn revision(&self) -> &RevisionId {
        &self.revision
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An archive available remotely, with its response body held open
#[derive(Debug)]
pub struct RemoteCache {
    revision: RevisionId,
    url: String,
    storage: CacheStorage,
    stream: Option<RemoteStream>,
}

impl RemoteCache {
    /// Open a connection to `<base_url><file name for revision>`
    pub fn open(
        transport: &dyn Transport,
        base_url: &str,
        storage: &CacheStorage,
        revision: RevisionId,
    ) -> RevcacheResult<Self> {
        let url = format!("{}{}", base_url, storage.file_name(&revision));
        let stream = transport.open(&url)?;
        debug!("Opened {}", url);
        Ok(Self {
            revision,
            url,
            storage: storage.clone(),
            stream: Some(stream),
        })
    }

    pub fn revision(&self) -> &RevisionId {
        &self.revision
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the connection is still held
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection without downloading. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.stream.take().is_some() {
            debug!("Released {}", self.url);
        }
    }

    /// Download into local storage and return the local reference.
    ///
    /// The archive is written to a temp file and renamed into place, so a
    /// failed or short transfer never leaves a file at the final path.
    pub fn materialize(mut self, progress: &ProgressBar) -> RevcacheResult<LocalCache> {
        let stream = self.stream.take().ok_or_else(|| {
            RevcacheError::Internal(format!("connection to {} already released", self.url))
        })?;
        let expected = stream.content_length;
        if let Some(len) = expected {
            progress.set_length(len);
        }

        info!("Downloading {}", self.url);
        let url = self.url.clone();
        let mut reader = stream.reader;
        let path = self.storage.atomic_write_with(&self.revision, |file| {
            let received = copy_with_progress(&mut reader, file, progress, &url)?;
            match expected {
                Some(expected) if expected != received => Err(RevcacheError::Incomplete {
                    url: url.clone(),
                    received,
                    expected,
                }),
                _ => Ok(()),
            }
        })?;
        progress.finish();

        Ok(LocalCache {
            revision: self.revision.clone(),
            path,
        })
    }
}

impl Drop for RemoteCache {
    fn drop(&mut self) {
        self.release();
    }
}

/// Stream `reader` into `writer`, reporting bytes as they land.
/// Read failures are transport errors; write failures are I/O errors.
fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    progress: &ProgressBar,
    url: &str,
) -> RevcacheResult<u64> {
    let mut buffer = vec![0_u8; COPY_BUFFER_SIZE];
    let mut received: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RevcacheError::transport(url, e)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| RevcacheError::io(format!("writing archive from {}", url), e))?;
        received += read as u64;
        progress.inc(read as u64);
    }
    Ok(received)
}

/// The cache for one revision, local or remote
#[derive(Debug)]
pub enum CacheReference {
    Local(LocalCache),
    Remote(RemoteCache),
}

impl CacheReference {
    pub fn revision(&self) -> &RevisionId {
        match self {
            Self::Local(local) => local.revision(),
            Self::Remote(remote) => remote.revision(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Close any held connection. No-op for local references.
    pub fn release(&mut self) {
        if let Self::Remote(remote) = self {
            remote.release();
        }
    }

    /// Turn into a local reference, downloading if needed
    pub fn materialize(self, progress: &ProgressBar) -> RevcacheResult<LocalCache> {
        match self {
            Self::Local(local) => Ok(local),
            Self::Remote(remote) => remote.materialize(progress),
        }
    }
}

/// Candidates collected by an ancestor search, closest first.
///
/// Owns every connection opened during the search. Anything still held
/// when the set is dropped is released.
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<CacheReference>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reference: CacheReference) {
        self.candidates.push(reference);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Revisions of all candidates, in order
    pub fn revisions(&self) -> Vec<RevisionId> {
        self.candidates.iter().map(|c| c.revision().clone()).collect()
    }

    /// Number of remote connections still held
    pub fn open_connections(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| matches!(c, CacheReference::Remote(r) if r.is_open()))
            .count()
    }

    /// Remove and return the closest candidate
    pub fn take_first(&mut self) -> Option<CacheReference> {
        if self.candidates.is_empty() {
            None
        } else {
            Some(self.candidates.remove(0))
        }
    }

    /// Remove and return every candidate, leaving the set empty
    pub fn take_all(&mut self) -> Vec<CacheReference> {
        std::mem::take(&mut self.candidates)
    }

    /// Release every connection still held by the set
    pub fn release_all(&mut self) {
        for candidate in &mut self.candidates {
            candidate.release();
        }
    }
}

impl Drop for CandidateSet {
    fn drop(&mut self) {
        self.release_all();
    }
}
