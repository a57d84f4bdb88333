//! Configuration view and validation commands — `webinstall config`.

use anyhow::Result;
use std::path::PathBuf;

use webinstall::installer_config::{CONFIG_FILE_NAME, InstallerConfig, InstallerToml};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, root: PathBuf, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Installer Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No installer.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = InstallerConfig::new(root, Some(config_path))?;
            print!("{}", toml::to_string_pretty(&config.toml)?);
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  env_file = \"{}\"", config.env_file().display());
            println!("  apps_dir = \"{}\"", config.apps_dir().display());
            println!("  cache_dir = \"{}\"", config.cache_dir().display());
            println!("  console = \"{}\"", config.console_program().display());
            println!("  listen = \"{}:{}\"", config.host(), config.port());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No installer.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = InstallerToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("installer.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            InstallerToml::default().save(&config_path)?;

            println!("Created installer.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [paths] env_file, apps_dir, cache_dir");
            println!("  - [console] bin, timeout_secs");
            println!("  - [package] name, marker_dir");
            println!();
        }
    }

    Ok(())
}
