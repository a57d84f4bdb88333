use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "webinstall")]
#[command(version, about = "Browser-driven installer for Fusio deployments")]
pub struct Cli {
    /// Application root. Defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Path to installer.toml. Defaults to <root>/installer.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the installation steps over HTTP
    Serve {
        /// Port to serve on (overrides installer.toml and WEBINSTALL_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Open the browser once the server is listening
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS for a separately served front-end)
        #[arg(long)]
        dev: bool,
    },
    /// Run every remaining step from the terminal
    Run(RunArgs),
    /// Run a single step and print its JSON response
    Step {
        /// Step name, e.g. `configure` or `create-admin`
        name: String,

        /// Step parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// List the installation steps in order
    Steps,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Drive a running installer server instead of running in-process
    #[arg(long)]
    pub server: Option<String>,

    /// Project key (generated when omitted)
    #[arg(long)]
    pub key: Option<String>,

    /// Public URL of the API
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub db_name: Option<String>,

    #[arg(long)]
    pub db_user: Option<String>,

    #[arg(long)]
    pub db_pw: Option<String>,

    #[arg(long)]
    pub db_host: Option<String>,

    /// Admin username
    #[arg(long)]
    pub username: Option<String>,

    /// Admin password (prompted for when missing)
    #[arg(long)]
    pub password: Option<String>,

    /// Admin email
    #[arg(long)]
    pub email: Option<String>,

    /// Never prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default installer.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = match cli.root.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let directive = if cli.verbose {
        "webinstall=debug"
    } else if matches!(cli.command, Commands::Run(_)) {
        // Keep the progress bar readable
        "webinstall=warn"
    } else {
        webinstall::logging::DEFAULT_DIRECTIVE
    };
    webinstall::logging::init(cli.log_json, directive)?;

    match &cli.command {
        Commands::Serve {
            port,
            host,
            open,
            dev,
        } => {
            cmd::cmd_serve(&cli, root, host.clone(), *port, *open, *dev).await?;
        }
        Commands::Run(args) => {
            if !cmd::cmd_run(&cli, root, args).await? {
                std::process::exit(1);
            }
        }
        Commands::Step { name, params } => {
            if !cmd::cmd_step(&cli, root, name, params.as_deref()).await? {
                std::process::exit(1);
            }
        }
        Commands::Steps => cmd::cmd_steps(),
        Commands::Config { command } => cmd::cmd_config(&cli, root, command.clone())?,
    }

    Ok(())
}
