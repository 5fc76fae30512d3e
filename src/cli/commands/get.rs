//! Get command - resolve a revision to a local archive

use crate::cache::{CacheLocator, HttpTransport};
use crate::cli::args::GetArgs;
use crate::config::Config;
use crate::error::{RevcacheError, RevcacheResult};
use crate::ui::{self, DownloadProgress, UiContext};
use crate::vcs::{AncestryProvider, GitProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Execute the get command
pub async fn execute(args: GetArgs, config: &Config) -> RevcacheResult<()> {
    let ctx = UiContext::detect();
    let git = Arc::new(GitProvider::new(repo_dir(args.repo)?));

    if !args.force && git.is_dirty().await? {
        return Err(RevcacheError::DirtyWorktree(git.workdir().to_path_buf()));
    }

    let revision = match args.rev.as_deref() {
        Some(rev) => git.resolve(rev).await?,
        None => git.head().await?,
    };
    debug!("Resolved revision {}", revision);

    let policy = args.fallback.unwrap_or(config.cache.fallback);
    let remote = args.url.as_deref().or(config.cache.remote_url.as_deref());
    if remote.is_none() {
        if args.force_download {
            ui::step_warn(&ctx, "--force-download has no effect without a remote URL");
        }
        debug!("No remote configured; local storage only");
    }

    let locator = CacheLocator::new(
        config.cache.subject.clone(),
        git.clone(),
        config.cache.storage(),
    )
    .with_transport(Arc::new(HttpTransport::new()))
    .with_remote(remote)
    .with_force_download(args.force_download)
    .with_jobs(args.jobs.unwrap_or(config.cache.jobs))
    .with_progress(DownloadProgress::new(&ctx));

    let local = locator.find_local_with_fallback(&revision, policy).await?;

    if local.revision() != &revision {
        let short = git
            .short(local.revision())
            .await
            .unwrap_or_else(|_| local.revision().short().to_string());
        ui::step_warn_hint(
            &ctx,
            &format!(
                "No {} archive for {}; using ancestor {}",
                locator.subject(),
                revision.short(),
                short
            ),
            &format!("pin with `revcache get {}`", local.revision()),
        );
    } else {
        ui::step_ok_detail(
            &ctx,
            &format!("{} archive ready", locator.subject()),
            revision.short(),
        );
    }

    println!("{}", local.path().display());
    Ok(())
}

/// Repository directory from `--repo`, or the current directory
pub(crate) fn repo_dir(repo: Option<PathBuf>) -> RevcacheResult<PathBuf> {
    match repo {
        Some(path) => Ok(path),
        None => std::env::current_dir()
            .map_err(|e| RevcacheError::io("getting current directory", e)),
    }
}
