//! Download progress with CI fallback

use super::context::UiContext;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Hands out byte-progress bars for archive downloads.
///
/// Concurrent downloads share one `MultiProgress` so their bars stack.
/// In non-interactive mode every bar is hidden, so callers can report
/// progress unconditionally.
#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    multi: Option<MultiProgress>,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext) -> Self {
        if ctx.use_fancy_output() {
            Self {
                multi: Some(MultiProgress::new()),
            }
        } else {
            Self::hidden()
        }
    }

    /// Progress that draws nothing
    pub fn hidden() -> Self {
        Self { multi: None }
    }

    /// A new bar labelled with `label` (typically a short revision)
    pub fn bar(&self, label: &str) -> ProgressBar {
        let Some(ref multi) = self.multi else {
            return ProgressBar::hidden();
        };

        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(download_style());
        bar.set_prefix(label.to_string());
        bar
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "  {spinner:.cyan} {prefix}  {bar:20.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}  {eta:.dim}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .progress_chars("━╸─")
}
