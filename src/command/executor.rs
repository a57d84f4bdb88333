//! Command execution capability.
//!
//! `ProcessExecutor` runs the application's console binary as a subprocess:
//! `<bin> <command> <args...> --no-interaction`, stdin closed, stdout and
//! stderr captured into one buffer.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CommandInvocation, CommandOutput};
use crate::errors::CommandFault;

/// Capability object the runner is built from.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandFault>;
}

pub struct ProcessExecutor {
    program: PathBuf,
    working_dir: PathBuf,
    non_interactive_flag: Option<String>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.as_ref().to_path_buf(),
            non_interactive_flag: None,
        }
    }

    /// Switch appended to every invocation to suppress prompts.
    pub fn with_non_interactive_flag(mut self, flag: Option<String>) -> Self {
        self.non_interactive_flag = flag.filter(|f| !f.is_empty());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandFault> {
        let child = Command::new(&self.program)
            .args(invocation.argv())
            .args(self.non_interactive_flag.iter())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("NO_COLOR", "1")
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandFault::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| CommandFault::Wait {
                command: invocation.command.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        Ok(CommandOutput {
            text,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::CommandArg;
    use crate::testing::create_test_script;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_execute_captures_stdout_and_exit_code() {
        let dir = tempdir().unwrap();
        let script = create_test_script(dir.path(), "console", "#!/bin/sh\necho \"ran $1\"\nexit 0\n");
        let executor = ProcessExecutor::new(&script, dir.path());

        let output = executor
            .execute(&CommandInvocation::new("migration:migrate", vec![]))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.text.trim(), "ran migration:migrate");
    }

    #[tokio::test]
    async fn test_execute_merges_stderr_and_keeps_failure_code() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "console",
            "#!/bin/sh\necho 'partial'\necho 'broken' >&2\nexit 3\n",
        );
        let executor = ProcessExecutor::new(&script, dir.path());

        let output = executor
            .execute(&CommandInvocation::new("adduser", vec![]))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(output.text.contains("partial"));
        assert!(output.text.contains("broken"));
    }

    #[tokio::test]
    async fn test_execute_passes_args_and_non_interactive_flag() {
        let dir = tempdir().unwrap();
        let script = create_test_script(dir.path(), "console", "#!/bin/sh\necho \"$@\"\n");
        let executor = ProcessExecutor::new(&script, dir.path())
            .with_non_interactive_flag(Some("--no-interaction".into()));

        let output = executor
            .execute(&CommandInvocation::new(
                "marketplace:install",
                vec![
                    CommandArg::flag("disable_ssl_verify"),
                    CommandArg::positional("app"),
                    CommandArg::positional("fusio/fusio"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(
            output.text.trim(),
            "marketplace:install --disable_ssl_verify app fusio/fusio --no-interaction"
        );
    }

    #[tokio::test]
    async fn test_execute_missing_program_is_spawn_fault() {
        let dir = tempdir().unwrap();
        let executor = ProcessExecutor::new(dir.path().join("missing"), dir.path());
        let err = executor
            .execute(&CommandInvocation::new("migration:migrate", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandFault::Spawn { .. }));
    }
}
