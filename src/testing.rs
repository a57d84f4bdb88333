//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::accessor::{AppConfigAccessor, ConfigAccessor};
use crate::command::{CommandExecutor, CommandInvocation, CommandOutput, CommandRunner};
use crate::config_store::{ConfigStore, ConfigWriter, WriteOutcome};
use crate::database::{ConnectionParams, DatabaseProbe};
use crate::errors::{CommandFault, ConfigStoreError, ProbeError};
use crate::installer_config::{CommandsSection, PackageSection};
use crate::overlay::{self, ConfigOverlay};
use crate::preconditions::{WriteAccess, is_writable};
use crate::steps::{Installer, StepSettings};

pub fn create_test_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let script_path = dir.join(name);
    std::fs::write(&script_path, content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms).unwrap();
    }
    script_path
}

#[derive(Debug, Clone)]
pub enum ScriptedResult {
    Exit(i32, String),
    Fault(String),
}

impl ScriptedResult {
    pub fn exit(code: i32, text: &str) -> Self {
        ScriptedResult::Exit(code, text.to_string())
    }

    pub fn fault(message: &str) -> Self {
        ScriptedResult::Fault(message.to_string())
    }
}

/// Executor that answers from a table and records every invocation.
/// Unscripted commands exit 0 with no output.
#[derive(Default)]
pub struct RecordingExecutor {
    responses: HashMap<String, ScriptedResult>,
    calls: Mutex<Vec<CommandInvocation>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, result: ScriptedResult) -> Self {
        self.responses.insert(command.to_string(), result);
        self
    }

    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.command).collect()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandFault> {
        self.calls.lock().unwrap().push(invocation.clone());
        match self.responses.get(&invocation.command) {
            Some(ScriptedResult::Exit(code, text)) => Ok(CommandOutput::new(text.clone(), *code)),
            Some(ScriptedResult::Fault(message)) => Err(CommandFault::Internal(message.clone())),
            None => Ok(CommandOutput::new("", 0)),
        }
    }
}

/// Probe with a fixed answer that counts connection attempts.
pub struct StaticProbe {
    reachable: bool,
    attempts: Arc<AtomicUsize>,
}

impl StaticProbe {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::reachable()
        }
    }

    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl DatabaseProbe for StaticProbe {
    async fn connect(&self, params: &ConnectionParams) -> Result<(), ProbeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reachable {
            Ok(())
        } else {
            Err(ProbeError::Connect {
                address: params.address().unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            })
        }
    }
}

#[derive(Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl ConfigAccessor for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Write access that refuses the listed paths and defers to the process
/// permissions for everything else.
#[derive(Default)]
pub struct DeniedWrites {
    denied: Vec<PathBuf>,
}

impl DeniedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(mut self, path: impl Into<PathBuf>) -> Self {
        self.denied.push(path.into());
        self
    }
}

impl WriteAccess for DeniedWrites {
    fn is_writable(&self, path: &Path) -> bool {
        !self.denied.iter().any(|p| p == path) && is_writable(path)
    }
}

/// How a [`FailingWriter`] fails.
#[derive(Debug, Clone, Copy)]
pub enum WriterFault {
    Read,
    Parse,
    Write,
}

/// Config writer whose every `apply` fails without touching the disk.
pub struct FailingWriter {
    path: PathBuf,
    fault: WriterFault,
}

impl FailingWriter {
    pub fn new(path: impl Into<PathBuf>, fault: WriterFault) -> Self {
        Self {
            path: path.into(),
            fault,
        }
    }
}

impl ConfigWriter for FailingWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn apply(&self, _overlay: &ConfigOverlay) -> Result<WriteOutcome, ConfigStoreError> {
        let path = self.path.clone();
        let denied = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        Err(match self.fault {
            WriterFault::Read => ConfigStoreError::Read {
                path,
                source: denied(),
            },
            WriterFault::Parse => ConfigStoreError::Parse {
                path,
                message: "unterminated quote".to_string(),
            },
            WriterFault::Write => ConfigStoreError::Write {
                path,
                source: denied(),
            },
        })
    }
}

pub fn valid_overlay() -> ConfigOverlay {
    ConfigOverlay::new()
        .set(overlay::PROJECT_KEY, "abc123")
        .set(overlay::URL, "https://example.com/fusio")
        .set(overlay::APPS_URL, "https://example.com/fusio/apps")
        .set(overlay::CONNECTION, "pdo-mysql://u:p@localhost/f")
}

pub const FRESH_ENV: &str = "APP_PROJECT_KEY=\"\"\nAPP_URL=\"\"\nAPP_APPS_URL=\"\"\nAPP_CONNECTION=\"\"\n";

/// An unconfigured deployment in a temp dir: `apps/`, `cache/` and a
/// `.env` holding the four installer keys.
pub struct AppFixture {
    pub dir: TempDir,
    pub executor: Arc<RecordingExecutor>,
    probe_attempts: Arc<AtomicUsize>,
    pub installer: Installer,
}

impl AppFixture {
    pub fn new() -> Self {
        Self::with(RecordingExecutor::new(), StaticProbe::reachable())
    }

    pub fn with(executor: RecordingExecutor, probe: StaticProbe) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("apps")).unwrap();
        std::fs::create_dir(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join(".env"), FRESH_ENV).unwrap();

        let settings = StepSettings {
            env_file: dir.path().join(".env"),
            apps_dir: dir.path().join("apps"),
            console_bin: "bin/fusio".to_string(),
            commands: CommandsSection::default(),
            package: PackageSection::default(),
        };
        let config = AppConfigAccessor::new(
            dir.path().join("apps"),
            dir.path().join("cache"),
            ConfigStore::new(dir.path().join(".env")),
        );

        let executor = Arc::new(executor);
        let probe_attempts = probe.attempts();
        let runner = CommandRunner::new(executor.clone(), std::time::Duration::from_secs(5));
        let installer = Installer::new(settings, Arc::new(config), Arc::new(probe), runner);

        Self {
            dir,
            executor,
            probe_attempts,
            installer,
        }
    }

    pub fn env_path(&self) -> PathBuf {
        self.dir.path().join(".env")
    }

    pub fn env_content(&self) -> String {
        std::fs::read_to_string(self.env_path()).unwrap()
    }

    pub fn probe_attempts(&self) -> usize {
        self.probe_attempts.load(Ordering::SeqCst)
    }
}
