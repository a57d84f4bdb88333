//! Installer configuration read from `installer.toml`.
//!
//! Layered: file → environment → CLI. Every field has a default, so an empty
//! or missing file yields a working configuration for a standard deployment.
//!
//! # Configuration File Format
//!
//! ```toml
//! [paths]
//! env_file = ".env"
//! apps_dir = "public/apps"
//! cache_dir = "cache"
//!
//! [console]
//! bin = "bin/fusio"
//! timeout_secs = 300
//! non_interactive_flag = "--no-interaction"
//!
//! [commands]
//! migrate = "migration:migrate"
//! check = "system:check"
//! check_target = "user"
//! add_user = "adduser"
//! admin_role = "1"
//! marketplace_install = "marketplace:install"
//!
//! [package]
//! type = "app"
//! name = "fusio/fusio"
//! marker_dir = "fusio"
//!
//! [database]
//! probe_timeout_secs = 5
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Relative paths resolve against the application root.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "installer.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Application config file the configure step rewrites
    #[serde(default = "default_env_file")]
    pub env_file: String,
    /// Directory extension packages are installed into
    #[serde(default = "default_apps_dir")]
    pub apps_dir: String,
    /// Cache directory that must be writable
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

fn default_env_file() -> String {
    ".env".to_string()
}

fn default_apps_dir() -> String {
    "public/apps".to_string()
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            apps_dir: default_apps_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSection {
    /// Console binary every command is dispatched to
    #[serde(default = "default_console_bin")]
    pub bin: String,
    /// Upper bound for a single command
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Appended to every invocation; empty disables it
    #[serde(default = "default_non_interactive_flag")]
    pub non_interactive_flag: String,
}

fn default_console_bin() -> String {
    "bin/fusio".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_non_interactive_flag() -> String {
    "--no-interaction".to_string()
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            bin: default_console_bin(),
            timeout_secs: default_timeout_secs(),
            non_interactive_flag: default_non_interactive_flag(),
        }
    }
}

/// Console command names used by the step handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsSection {
    #[serde(default = "default_migrate")]
    pub migrate: String,
    /// Exits 0 when `check_target` is already set up
    #[serde(default = "default_check")]
    pub check: String,
    #[serde(default = "default_check_target")]
    pub check_target: String,
    #[serde(default = "default_add_user")]
    pub add_user: String,
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default = "default_marketplace_install")]
    pub marketplace_install: String,
}

fn default_migrate() -> String {
    "migration:migrate".to_string()
}

fn default_check() -> String {
    "system:check".to_string()
}

fn default_check_target() -> String {
    "user".to_string()
}

fn default_add_user() -> String {
    "adduser".to_string()
}

fn default_admin_role() -> String {
    "1".to_string()
}

fn default_marketplace_install() -> String {
    "marketplace:install".to_string()
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            migrate: default_migrate(),
            check: default_check(),
            check_target: default_check_target(),
            add_user: default_add_user(),
            admin_role: default_admin_role(),
            marketplace_install: default_marketplace_install(),
        }
    }
}

/// Default extension package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    #[serde(default = "default_package_type", rename = "type")]
    pub kind: String,
    #[serde(default = "default_package_name")]
    pub name: String,
    /// Directory below `apps_dir` whose presence means "already installed"
    #[serde(default = "default_marker_dir")]
    pub marker_dir: String,
}

fn default_package_type() -> String {
    "app".to_string()
}

fn default_package_name() -> String {
    "fusio/fusio".to_string()
}

fn default_marker_dir() -> String {
    "fusio".to_string()
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            kind: default_package_type(),
            name: default_package_name(),
            marker_dir: default_marker_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_probe_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The complete installer.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallerToml {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub console: ConsoleSection,
    #[serde(default)]
    pub commands: CommandsSection,
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl InstallerToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse installer.toml")
    }

    /// Returns the defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize installer.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.console.timeout_secs == 0 {
            warnings.push("console.timeout_secs is 0: every command would time out".to_string());
        }
        if self.database.probe_timeout_secs == 0 {
            warnings.push(
                "database.probe_timeout_secs is 0: the database check can never pass".to_string(),
            );
        }
        if self.console.bin.trim().is_empty() {
            warnings.push("console.bin is empty".to_string());
        }

        let commands = [
            ("migrate", &self.commands.migrate),
            ("check", &self.commands.check),
            ("add_user", &self.commands.add_user),
            ("marketplace_install", &self.commands.marketplace_install),
        ];
        for (name, value) in commands {
            if value.trim().is_empty() {
                warnings.push(format!("commands.{} is empty", name));
            }
        }

        if self.package.marker_dir.trim().is_empty() {
            warnings.push(
                "package.marker_dir is empty: the package would always count as installed"
                    .to_string(),
            );
        }

        warnings
    }
}

/// Runtime configuration: parsed file plus environment and CLI overrides,
/// with paths resolved against the application root.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub app_root: PathBuf,
    pub config_file: PathBuf,
    pub toml: InstallerToml,
    /// CLI override for the listen port
    pub cli_port: Option<u16>,
    /// CLI override for the listen address
    pub cli_host: Option<String>,
}

impl InstallerConfig {
    /// Load `installer.toml` from `config_file`, or from the app root when
    /// not given.
    pub fn new(app_root: PathBuf, config_file: Option<PathBuf>) -> Result<Self> {
        let app_root = app_root
            .canonicalize()
            .context("Failed to resolve application root")?;
        let config_file = config_file.unwrap_or_else(|| app_root.join(CONFIG_FILE_NAME));
        let toml = InstallerToml::load_or_default(&config_file)?;

        Ok(Self {
            app_root,
            config_file,
            toml,
            cli_port: None,
            cli_host: None,
        })
    }

    pub fn with_cli_args(
        app_root: PathBuf,
        config_file: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<Self> {
        let mut config = Self::new(app_root, config_file)?;
        config.cli_host = host;
        config.cli_port = port;
        Ok(config)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_root.join(path)
        }
    }

    pub fn env_file(&self) -> PathBuf {
        self.resolve(&self.toml.paths.env_file)
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.apps_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.cache_dir)
    }

    /// Console binary as configured (env → file), for messages.
    pub fn console_bin(&self) -> String {
        std::env::var("WEBINSTALL_CONSOLE_BIN").unwrap_or_else(|_| self.toml.console.bin.clone())
    }

    /// Console binary resolved against the application root.
    pub fn console_program(&self) -> PathBuf {
        self.resolve(&self.console_bin())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.console.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.database.probe_timeout_secs)
    }

    pub fn non_interactive_flag(&self) -> Option<String> {
        let flag = self.toml.console.non_interactive_flag.trim();
        (!flag.is_empty()).then(|| flag.to_string())
    }

    /// Listen address (CLI → file).
    pub fn host(&self) -> String {
        self.cli_host
            .clone()
            .unwrap_or_else(|| self.toml.server.host.clone())
    }

    /// Listen port (CLI → env → file).
    pub fn port(&self) -> u16 {
        if let Some(port) = self.cli_port {
            return port;
        }
        std::env::var("WEBINSTALL_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.toml.server.port)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
