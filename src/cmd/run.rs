//! Terminal installation run — `webinstall run`.

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use webinstall::common::{InstallStep, StepParams};
use webinstall::sequencer::{HttpClient, LocalClient, Sequencer};
use webinstall::steps::Installer;
use webinstall::ui::InstallerUI;
use webinstall::util::generate_project_key;

use super::super::{Cli, RunArgs};
use super::load_config;

impl RunArgs {
    fn to_params(&self) -> StepParams {
        StepParams {
            key: self.key.clone(),
            url: self.url.clone(),
            db_name: self.db_name.clone(),
            db_user: self.db_user.clone(),
            db_pw: self.db_pw.clone(),
            db_host: self.db_host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
        }
    }
}

/// Walk every step. Returns whether the installation finished. Without
/// `--key` a fresh project key is generated and printed with the summary.
pub async fn cmd_run(cli: &Cli, root: PathBuf, args: &RunArgs) -> Result<bool> {
    let mut params = args.to_params();
    let generated_key = params.key.is_none().then(generate_project_key);
    if let Some(key) = &generated_key {
        params.key = Some(key.clone());
    }
    if params.password.is_none() && !args.yes {
        let password = dialoguer::Password::new()
            .with_prompt("Admin password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .context("Failed to read admin password")?;
        params.password = Some(password);
    }

    let ui = InstallerUI::new(InstallStep::ALL.len() as u64);
    let report = match &args.server {
        Some(url) => {
            let client = HttpClient::new(url)?;
            Sequencer::new(client).run(&params, &ui).await
        }
        None => {
            let config = load_config(cli, root)?;
            let installer = Arc::new(Installer::from_config(&config));
            Sequencer::new(LocalClient::new(installer))
                .run(&params, &ui)
                .await
        }
    };

    ui.finish(&report);
    if let Some(key) = generated_key {
        eprintln!("{} {}", style("Generated project key:").bold(), key);
    }
    Ok(report.success())
}
