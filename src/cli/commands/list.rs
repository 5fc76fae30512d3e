//! List command - show archives in local storage

use crate::cache::{format_bytes, StoredArchive};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::RevcacheResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> RevcacheResult<()> {
    let storage = config.cache.storage();
    let archives = storage.list()?;

    if archives.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(
                    &ctx,
                    &format!("No archives in {}", storage.root().display()),
                );
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&archives),
        OutputFormat::Json => print_json(&archives)?,
        OutputFormat::Plain => print_plain(&archives),
    }

    Ok(())
}

fn print_table(archives: &[StoredArchive]) {
    println!(
        "{:<42} {:>10} {:<17}",
        style("REVISION").bold(),
        style("SIZE").bold(),
        style("MODIFIED").bold()
    );
    println!("{}", "-".repeat(71));

    let mut total = 0;
    for archive in archives {
        total += archive.size_bytes;
        println!(
            "{:<42} {:>10} {:<17}",
            archive.revision,
            format_bytes(archive.size_bytes),
            archive.modified.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("{} archive(s), {}", archives.len(), format_bytes(total));
}

fn print_json(archives: &[StoredArchive]) -> RevcacheResult<()> {
    let json = serde_json::to_string_pretty(archives)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(archives: &[StoredArchive]) {
    for archive in archives {
        println!("{}", archive.path.display());
    }
}
