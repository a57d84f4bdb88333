//! Installer HTTP server command — `webinstall serve`.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use webinstall::installer_config::InstallerConfig;
use webinstall::server::{ServerConfig, start_server};
use webinstall::steps::Installer;

use super::super::Cli;

pub async fn cmd_serve(
    cli: &Cli,
    root: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
    dev: bool,
) -> Result<()> {
    let config = InstallerConfig::with_cli_args(root, cli.config.clone(), host, port)?;
    for warning in config.validate() {
        tracing::warn!(%warning, "configuration warning");
    }

    let installer = Arc::new(Installer::from_config(&config));
    let server_config = ServerConfig {
        host: config.host(),
        port: config.port(),
        dev_mode: dev,
    };

    start_server(server_config, installer, |url| {
        println!("Installer running at {}", url);
        if open {
            if let Err(e) = open::that(url) {
                eprintln!("Failed to open browser: {}", e);
            }
        }
    })
    .await
}
