//! Git-backed ancestry provider
//!
//! Shells out to the `git` CLI. Ancestry queries stream `git rev-list`
//! output line by line so an abandoned query costs no more than what was
//! read; the child process is killed when its stream is dropped.

use crate::error::{RevcacheError, RevcacheResult};
use crate::vcs::provider::{AncestryProvider, RevisionStream};
use crate::vcs::revision::RevisionId;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

/// Ancestry provider for a git working tree
#[derive(Debug, Clone)]
pub struct GitProvider {
    workdir: PathBuf,
}

impl GitProvider {
    /// Create a provider for the repository containing `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Repository working directory
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir);
        cmd
    }

    /// Execute a git command and return the output
    async fn exec(&self, args: &[&str]) -> RevcacheResult<std::process::Output> {
        debug!("Executing: git {:?}", args);

        self.command()
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RevcacheError::command_failed(format!("git {:?}", args), e))
    }

    /// Execute a git command, failing on a non-zero exit, and return trimmed stdout
    async fn exec_stdout(&self, args: &[&str]) -> RevcacheResult<String> {
        let output = self.exec(args).await?;
        if !output.status.success() {
            return Err(RevcacheError::git(
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// The commit currently checked out
    pub async fn head(&self) -> RevcacheResult<RevisionId> {
        self.resolve("HEAD").await
    }

    /// Whether tracked files have uncommitted changes
    pub async fn is_dirty(&self) -> RevcacheResult<bool> {
        let status = self
            .exec_stdout(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        Ok(!status.is_empty())
    }

    /// Shortest unambiguous abbreviation of `rev`
    pub async fn short(&self, rev: &RevisionId) -> RevcacheResult<String> {
        self.exec_stdout(&["rev-parse", "--short", rev.as_str()]).await
    }
}

type RevListState = (Lines<BufReader<ChildStdout>>, Option<Child>);

/// Read one line of `git rev-list` output
async fn next_revision(
    (mut lines, mut child): RevListState,
) -> RevcacheResult<Option<(RevisionId, RevListState)>> {
    let line = lines
        .next_line()
        .await
        .map_err(|e| RevcacheError::io("reading git rev-list output", e))?;

    if let Some(line) = line {
        return Ok(Some((RevisionId::new(line.trim()), (lines, child))));
    }

    // stdout closed; surface a failed exit instead of an empty history
    if let Some(child) = child.take() {
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RevcacheError::command_failed("git rev-list", e))?;
        if !output.status.success() {
            return Err(RevcacheError::git(
                "rev-list",
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
    }
    Ok(None)
}

#[async_trait]
impl AncestryProvider for GitProvider {
    async fn ancestors(
        &self,
        start: &RevisionId,
        exclude: &[RevisionId],
    ) -> RevcacheResult<RevisionStream> {
        let mut cmd = self.command();
        cmd.args(["rev-list", "--topo-order", start.as_str()]);
        if !exclude.is_empty() {
            cmd.arg("--not");
            cmd.args(exclude.iter().map(RevisionId::as_str));
        }
        debug!(
            "Executing: git rev-list --topo-order {} ({} excluded)",
            start,
            exclude.len()
        );

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RevcacheError::command_failed("git rev-list", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RevcacheError::Internal("git rev-list stdout not piped".to_string()))?;
        let lines = BufReader::new(stdout).lines();

        let revisions = stream::try_unfold((lines, Some(child)), next_revision);
        Ok(revisions.boxed())
    }

    async fn resolve(&self, partial: &str) -> RevcacheResult<RevisionId> {
        let spec = format!("{}^{{commit}}", partial);
        let output = self.exec(&["rev-parse", "--verify", "--quiet", &spec]).await?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() || id.is_empty() {
            return Err(RevcacheError::AmbiguousRevision(partial.to_string()));
        }
        Ok(RevisionId::new(id))
    }
}
