use crate::cli::parser::Commands;
use crate::config::Config;
use crate::config::migrate::fill_missing_keys;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};
use std::path::Path;

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config, config_path: &Path) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        migrate,
    } = cmd
    {
        if *migrate {
            let added = fill_missing_keys(config_path)?;
            if added.is_empty() {
                info(format!("{} is up to date", config_path.display()));
            } else {
                success(format!(
                    "Added to {}: {}",
                    config_path.display(),
                    added.join(", ")
                ));
            }
        }

        if *print_config || !*migrate {
            info(format!("Configuration file: {}", config_path.display()));
            println!("{}", serde_yaml::to_string(cfg)?);
        }
    }

    Ok(())
}
