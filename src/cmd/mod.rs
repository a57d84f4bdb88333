//! CLI command implementations.
//!
//! | Module   | Commands handled  |
//! |----------|-------------------|
//! | `serve`  | `Serve`           |
//! | `run`    | `Run`             |
//! | `step`   | `Step`, `Steps`   |
//! | `config` | `Config`          |

pub mod config;
pub mod run;
pub mod serve;
pub mod step;

pub use config::cmd_config;
pub use run::cmd_run;
pub use serve::cmd_serve;
pub use step::{cmd_step, cmd_steps};

use anyhow::Result;
use std::path::PathBuf;
use webinstall::installer_config::InstallerConfig;

use super::Cli;

/// Load installer.toml for the selected root, reporting validation warnings.
fn load_config(cli: &Cli, root: PathBuf) -> Result<InstallerConfig> {
    let config = InstallerConfig::new(root, cli.config.clone())?;
    for warning in config.validate() {
        tracing::warn!(%warning, "configuration warning");
    }
    Ok(config)
}
