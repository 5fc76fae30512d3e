//! CLI argument definitions using clap derive

use crate::cache::FallbackPolicy;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// revcache - Revision-keyed artifact cache
///
/// Fetches the prebuilt archive for a git revision, falling back to the
/// closest cached ancestors when the revision itself was never built.
#[derive(Parser, Debug)]
#[command(name = "revcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REVCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Archive storage directory
    #[arg(long, global = true, env = "REVCACHE_DIR")]
    pub storage: Option<PathBuf>,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the archive for a revision and print its local path
    Get(GetArgs),

    /// List archives in local storage
    List(ListArgs),

    /// Put an archive into local storage for a revision
    Store(StoreArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Revision to fetch (defaults to HEAD)
    pub rev: Option<String>,

    /// Repository directory (defaults to current directory)
    #[arg(short = 'C', long)]
    pub repo: Option<PathBuf>,

    /// What to do when the revision has no archive of its own
    #[arg(long, value_enum)]
    pub fallback: Option<FallbackPolicy>,

    /// Ignore local storage and download from the remote
    #[arg(long)]
    pub force_download: bool,

    /// Remote mirror base URL
    #[arg(long, env = "REVCACHE_URL")]
    pub url: Option<String>,

    /// Maximum concurrent downloads for download-all
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Proceed even if the working tree has uncommitted changes
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the store command
#[derive(Parser, Debug)]
pub struct StoreArgs {
    /// Archive file to store
    pub archive: PathBuf,

    /// Revision the archive was built from (defaults to HEAD)
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Repository directory (defaults to current directory)
    #[arg(short = 'C', long)]
    pub repo: Option<PathBuf>,

    /// Replace an existing archive
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.fallback)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
