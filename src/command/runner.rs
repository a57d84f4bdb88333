use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use super::{CommandArg, CommandExecutor, CommandInvocation, CommandOutput};
use crate::errors::CommandFault;

/// Runs named operations through an injected [`CommandExecutor`].
#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn CommandExecutor>,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run and report internal faults as `Err`.
    ///
    /// The executor runs on its own task, so a panic inside it surfaces as
    /// [`CommandFault::Internal`] and a timeout aborts the task (dropping, and
    /// thereby killing, any child process).
    pub async fn try_run(
        &self,
        command: &str,
        args: Vec<CommandArg>,
    ) -> Result<CommandOutput, CommandFault> {
        let invocation = CommandInvocation::new(command, args);
        tracing::info!(command = %invocation, "running command");

        let executor = Arc::clone(&self.executor);
        let task_invocation = invocation.clone();
        let mut handle = tokio::spawn(async move { executor.execute(&task_invocation).await });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(CommandFault::Internal(panic_message(join_err.into_panic())))
            }
            Ok(Err(join_err)) => Err(CommandFault::Internal(join_err.to_string())),
            Err(_) => {
                handle.abort();
                Err(CommandFault::Timeout {
                    command: invocation.command,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Run and fold any fault into exit code `1` with the fault text as
    /// output. Never fails.
    pub async fn run(&self, command: &str, args: Vec<CommandArg>) -> CommandOutput {
        match self.try_run(command, args).await {
            Ok(output) => {
                tracing::info!(command, exit_code = output.exit_code, "command finished");
                output
            }
            Err(fault) => {
                tracing::warn!(command, error = %fault, "command faulted");
                CommandOutput::new(fault.to_string(), 1)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "command panicked".to_string()
    }
}
