//! Store command - add a locally built archive to storage

use super::get::repo_dir;
use crate::cli::args::StoreArgs;
use crate::config::Config;
use crate::error::{RevcacheError, RevcacheResult};
use crate::ui::{self, UiContext};
use crate::vcs::{AncestryProvider, GitProvider};

/// Execute the store command
pub async fn execute(args: StoreArgs, config: &Config) -> RevcacheResult<()> {
    let ctx = UiContext::detect();

    if !args.archive.is_file() {
        return Err(RevcacheError::NotFound(args.archive.display().to_string()));
    }

    let git = GitProvider::new(repo_dir(args.repo)?);
    let revision = match args.rev.as_deref() {
        Some(rev) => git.resolve(rev).await?,
        None => git.head().await?,
    };

    let storage = config.cache.storage();
    let archive = args.archive.clone();
    let force = args.force;
    let rev = revision.clone();
    let path = tokio::task::spawn_blocking(move || storage.store(&rev, &archive, force))
        .await
        .map_err(|e| RevcacheError::Internal(format!("store task failed: {}", e)))??;

    ui::step_ok_detail(
        &ctx,
        &format!("Stored {} archive for {}", config.cache.subject, revision.short()),
        &path.display().to_string(),
    );

    Ok(())
}
