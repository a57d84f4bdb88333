//! Step handlers.
//!
//! [`Installer::execute`] is the only entry point: it runs one step and
//! returns its [`StepOutcome`]. Handlers report failures as [`StepFailure`]
//! values which are folded into a failed outcome at this boundary, so a
//! caller only ever sees `success` plus leveled messages.
//!
//! Every handler is safe to re-run:
//!
//! | Step              | Guard                                     |
//! |-------------------|-------------------------------------------|
//! | `configure`       | preconditions, checksum-gated write       |
//! | `migrate`         | the migration command itself              |
//! | `create-admin`    | check command exits 0 when an admin exists |
//! | `install-package` | marker directory below the apps dir       |
//! | `finish`          | read-only                                 |

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;
use webinstall_common::{InstallStep, StepOutcome, StepParams};

use crate::accessor::{self, AppConfigAccessor, ConfigAccessor};
use crate::command::{CommandArg, CommandOutput, CommandRunner, ProcessExecutor};
use crate::config_store::{ConfigStore, ConfigWriter, WriteOutcome};
use crate::database::{DatabaseProbe, NetworkProbe};
use crate::errors::{ConfigStoreError, StepFailure};
use crate::installer_config::{CommandsSection, InstallerConfig, PackageSection};
use crate::overlay::ConfigOverlay;
use crate::preconditions::{CheckTarget, PreconditionChecker};
use crate::util::escape_html;

/// What the handlers need to know about the deployment.
#[derive(Debug, Clone)]
pub struct StepSettings {
    pub env_file: PathBuf,
    pub apps_dir: PathBuf,
    /// Console binary as users would type it, for recovery hints
    pub console_bin: String,
    pub commands: CommandsSection,
    pub package: PackageSection,
}

impl StepSettings {
    pub fn from_config(config: &InstallerConfig) -> Self {
        Self {
            env_file: config.env_file(),
            apps_dir: config.apps_dir(),
            console_bin: config.console_bin(),
            commands: config.toml.commands.clone(),
            package: config.toml.package.clone(),
        }
    }

    fn marker_dir(&self) -> PathBuf {
        self.apps_dir.join(&self.package.marker_dir)
    }
}

pub type StepResult = Result<StepOutcome, StepFailure>;

pub struct Installer {
    settings: StepSettings,
    store: Arc<dyn ConfigWriter>,
    accessor: Arc<dyn ConfigAccessor>,
    checker: PreconditionChecker,
    runner: CommandRunner,
}

impl Installer {
    pub fn new(
        settings: StepSettings,
        accessor: Arc<dyn ConfigAccessor>,
        probe: Arc<dyn DatabaseProbe>,
        runner: CommandRunner,
    ) -> Self {
        Self {
            store: Arc::new(ConfigStore::new(settings.env_file.clone())),
            settings,
            accessor,
            checker: PreconditionChecker::new(probe),
            runner,
        }
    }

    /// Wire the production collaborators: the console binary, a network
    /// probe and the on-disk config file.
    pub fn from_config(config: &InstallerConfig) -> Self {
        let settings = StepSettings::from_config(config);
        let accessor = AppConfigAccessor::new(
            settings.apps_dir.clone(),
            config.cache_dir(),
            ConfigStore::new(settings.env_file.clone()),
        );
        let executor = ProcessExecutor::new(config.console_program(), &config.app_root)
            .with_non_interactive_flag(config.non_interactive_flag());
        let runner = CommandRunner::new(Arc::new(executor), config.command_timeout());

        Self::new(
            settings,
            Arc::new(accessor),
            Arc::new(NetworkProbe::new(config.probe_timeout())),
            runner,
        )
    }

    /// Commit configure's overlay through `store` instead of the env file.
    pub fn with_writer(mut self, store: Arc<dyn ConfigWriter>) -> Self {
        self.store = store;
        self
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    /// Run one step. Never fails; failures are part of the outcome.
    pub async fn execute(&self, step: InstallStep, params: &StepParams) -> StepOutcome {
        let span = tracing::info_span!("step", step = %step);
        async move {
            tracing::info!("step started");
            let result = match step {
                InstallStep::Configure => self.configure(params).await,
                InstallStep::Migrate => self.migrate().await,
                InstallStep::CreateAdmin => self.create_admin(params).await,
                InstallStep::InstallPackage => self.install_package().await,
                InstallStep::Finish => Ok(self.finish()),
            };

            match result {
                Ok(outcome) => {
                    tracing::info!(messages = outcome.messages.len(), "step succeeded");
                    outcome
                }
                Err(failure) => {
                    tracing::warn!(error = %failure, "step failed");
                    failure.into_outcome()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn configure(&self, params: &StepParams) -> StepResult {
        let overlay = ConfigOverlay::from_params(params);
        self.checker
            .check(&CheckTarget {
                config_file: self.store.path(),
                overlay: &overlay,
                config: self.accessor.as_ref(),
            })
            .await?;

        let file_name = self.store.file_name();
        match self.store.apply(&overlay) {
            Ok(WriteOutcome::Written) => Ok(StepOutcome::success(format!(
                "Adjusted <code>{}</code> file successful",
                file_name
            ))),
            Ok(WriteOutcome::Unchanged) => Ok(StepOutcome::ok()),
            Err(e) => {
                tracing::error!(error = %e, "config write failed");
                let action = match e {
                    ConfigStoreError::Read { .. } => "read",
                    ConfigStoreError::Parse { .. } => "parse",
                    ConfigStoreError::Write { .. } => "write",
                };
                Err(StepFailure::Persistence(format!(
                    "Could not {} <code>{}</code> file",
                    action, file_name
                )))
            }
        }
    }

    async fn migrate(&self) -> StepResult {
        let output = self.runner.run(&self.settings.commands.migrate, vec![]).await;
        if output.succeeded() {
            Ok(StepOutcome::success("Installation successful"))
        } else {
            Err(external("An error occurred on installation:", None, output))
        }
    }

    async fn create_admin(&self, params: &StepParams) -> StepResult {
        if self.has_admin().await {
            return Ok(StepOutcome::success("Admin user already exists"));
        }

        let commands = &self.settings.commands;
        let args = vec![
            CommandArg::named("role", commands.admin_role.as_str()),
            CommandArg::named("username", StepParams::field(&params.username)),
            CommandArg::secret("password", StepParams::field(&params.password)),
            CommandArg::named("email", StepParams::field(&params.email)),
        ];
        let output = self.runner.run(&commands.add_user, args).await;
        if output.succeeded() {
            Ok(StepOutcome::success("Added admin user successful"))
        } else {
            let hint = format!(
                "you can add a new admin account later on using the command <code>{} {}</code>",
                self.settings.console_bin, commands.add_user
            );
            Err(external("Could not create admin account", Some(hint), output))
        }
    }

    /// The check command exits 0 when an administrator already exists.
    async fn has_admin(&self) -> bool {
        let commands = &self.settings.commands;
        self.runner
            .run(
                &commands.check,
                vec![CommandArg::positional(commands.check_target.as_str())],
            )
            .await
            .succeeded()
    }

    async fn install_package(&self) -> StepResult {
        if self.settings.marker_dir().is_dir() {
            return Ok(StepOutcome::success("Backend app already installed"));
        }

        let commands = &self.settings.commands;
        let package = &self.settings.package;
        let args = vec![
            CommandArg::flag("disable_ssl_verify"),
            CommandArg::positional(package.kind.as_str()),
            CommandArg::positional(package.name.as_str()),
        ];
        let output = self.runner.run(&commands.marketplace_install, args).await;
        if output.succeeded() {
            Ok(StepOutcome::success("Installed backend app"))
        } else {
            let hint = format!(
                "you can install the backend app later on using the command <code>{} {} {}</code>",
                self.settings.console_bin, commands.marketplace_install, package.marker_dir
            );
            Err(external("Could not install backend app", Some(hint), output))
        }
    }

    fn finish(&self) -> StepOutcome {
        let api_url = escape_html(&self.accessor.get(accessor::URL).unwrap_or_default());
        let apps_url = escape_html(&self.accessor.get(accessor::APPS_URL).unwrap_or_default());
        StepOutcome::success(format!(
            "<p>Installation successful!</p>\n<dl>\n  <dt>API-Url</dt>\n  <dd><a href=\"{api}\">{api}</a></dd>\n  <dt>Apps-Url</dt>\n  <dd><a href=\"{apps}\">{apps}</a></dd>\n</dl>",
            api = api_url,
            apps = apps_url,
        ))
    }
}

fn external(summary: &str, hint: Option<String>, output: CommandOutput) -> StepFailure {
    StepFailure::ExternalOperation {
        summary: summary.to_string(),
        hint,
        output: output.text,
    }
}
