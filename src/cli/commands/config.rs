//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{RevcacheError, RevcacheResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: [&str; 7] = [
    "general.log_format",
    "cache.subject",
    "cache.storage_dir",
    "cache.remote_url",
    "cache.archive_ext",
    "cache.fallback",
    "cache.jobs",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> RevcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut updated = config.clone();
            set_value(&mut updated, &key, &value)?;
            manager.save(&updated).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> RevcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> RevcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

/// Apply one dot-separated key. An empty value clears optional keys.
fn set_value(config: &mut Config, key: &str, value: &str) -> RevcacheResult<()> {
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

    match key {
        "general.log_format" => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(RevcacheError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },
        "cache.subject" => config.cache.subject = value.to_string(),
        "cache.storage_dir" => config.cache.storage_dir = optional(value).map(PathBuf::from),
        "cache.remote_url" => config.cache.remote_url = optional(value),
        "cache.archive_ext" => {
            config.cache.archive_ext = value.trim_start_matches('.').to_string()
        }
        "cache.fallback" => config.cache.fallback = value.parse()?,
        "cache.jobs" => {
            config.cache.jobs = value
                .parse()
                .ok()
                .filter(|jobs| *jobs > 0)
                .ok_or_else(|| RevcacheError::User(format!("Invalid job count: {}", value)))?
        }
        _ => {
            return Err(RevcacheError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FallbackPolicy;

    #[test]
    fn set_known_keys() {
        let mut config = Config::default();
        set_value(&mut config, "cache.fallback", "download-all").unwrap();
        set_value(&mut config, "cache.jobs", "2").unwrap();
        set_value(&mut config, "cache.remote_url", "https://cache.example").unwrap();
        set_value(&mut config, "cache.archive_ext", ".tar.gz").unwrap();

        assert_eq!(config.cache.fallback, FallbackPolicy::DownloadAll);
        assert_eq!(config.cache.jobs, 2);
        assert_eq!(config.cache.remote_url.as_deref(), Some("https://cache.example"));
        assert_eq!(config.cache.archive_ext, "tar.gz");

        set_value(&mut config, "cache.remote_url", "").unwrap();
        assert!(config.cache.remote_url.is_none());
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(matches!(
            set_value(&mut config, "cache.fallback", "often"),
            Err(RevcacheError::InvalidPolicy(_))
        ));
        assert!(set_value(&mut config, "cache.jobs", "0").is_err());
        assert!(set_value(&mut config, "general.log_format", "xml").is_err());
        assert!(set_value(&mut config, "vm.name", "x").is_err());
    }
}
