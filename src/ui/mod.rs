//! UI module for CLI output
//!
//! Status lines go to stderr so stdout stays scriptable (`get` prints
//! only the archive path there). Interactive terminals get `cliclack`
//! styling and `indicatif` download bars; CI gets plain text.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_ok_detail, step_warn, step_warn_hint};
pub use progress::DownloadProgress;
