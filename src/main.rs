//! revcache - Revision-keyed artifact cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use revcache::cli::{Cli, Commands, LogFormat};
use revcache::config::ConfigManager;
use revcache::error::RevcacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RevcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config_result = config_manager.load().await;

    // Logging comes up before a config error is reported, so use the
    // file's format only when it loaded
    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => matches!(&config_result, Ok(c) if c.general.log_format == "json"),
    };
    init_logging(cli.verbose, json);

    let mut config = config_result?;

    // Config edits work on the file's values, without CLI overrides
    if let Commands::Config(args) = cli.command {
        return revcache::cli::commands::config(args, &config_manager, &config).await;
    }

    if let Some(dir) = cli.storage {
        debug!("Storage directory overridden: {}", dir.display());
        config.cache.storage_dir = Some(dir);
    }

    match cli.command {
        Commands::Get(args) => revcache::cli::commands::get(args, &config).await,
        Commands::List(args) => revcache::cli::commands::list(args, &config).await,
        Commands::Store(args) => revcache::cli::commands::store(args, &config).await,
        Commands::Config(_) => unreachable!("Config handled above"),
    }
}

/// 0 = warn, 1 = info, 2+ = debug; logs go to stderr
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("revcache=warn"),
        1 => EnvFilter::new("revcache=info"),
        _ => EnvFilter::new("revcache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
