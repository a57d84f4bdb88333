//! Single-step commands — `webinstall step` and `webinstall steps`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use webinstall::common::{InstallStep, StepParams, StepResponse};
use webinstall::steps::Installer;

use super::super::Cli;
use super::load_config;

/// Run one step in-process and print the response. Returns the step's
/// `success` flag.
pub async fn cmd_step(cli: &Cli, root: PathBuf, name: &str, params: Option<&str>) -> Result<bool> {
    let step: InstallStep = name.parse()?;
    let params: StepParams = match params {
        Some(json) => serde_json::from_str(json).context("Invalid --params JSON")?,
        None => StepParams::default(),
    };

    let config = load_config(cli, root)?;
    let installer = Installer::from_config(&config);
    let response = StepResponse::from(installer.execute(step, &params).await);

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.success)
}

pub fn cmd_steps() {
    for step in InstallStep::ALL {
        println!("{}. {:<16} {}", step.position() + 1, step.name(), step.label());
    }
}
