//! Command Runner boundary.
//!
//! Step handlers never spawn anything themselves. They call
//! [`CommandRunner::run`] with a command name and arguments and look at one
//! number: the exit code. Whatever goes wrong inside the invoked operation
//! (spawn failure, I/O error, timeout, even a panicking in-process executor)
//! is caught here and reported as exit code `1` with the fault text as
//! output.
//!
//! ```text
//! handler ── run(name, args) ──> CommandRunner ── execute() ──> CommandExecutor
//!                                    │ timeout + panic isolation     │
//!    <── CommandOutput{text, code} ──┘                               └─ ProcessExecutor (console binary)
//! ```

pub mod executor;
pub mod runner;

pub use executor::{CommandExecutor, ProcessExecutor};
pub use runner::CommandRunner;

/// A single argument passed to a console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    /// `--name`
    Flag(String),
    /// `--name=value`
    Named(String, String),
    /// `--name=value`, redacted in logs.
    Secret(String, String),
    /// `value`
    Positional(String),
}

impl CommandArg {
    pub fn flag(name: impl Into<String>) -> Self {
        CommandArg::Flag(name.into())
    }

    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        CommandArg::Named(name.into(), value.into())
    }

    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        CommandArg::Secret(name.into(), value.into())
    }

    pub fn positional(value: impl Into<String>) -> Self {
        CommandArg::Positional(value.into())
    }

    /// Command-line form handed to the process.
    pub fn to_arg(&self) -> String {
        match self {
            CommandArg::Flag(name) => format!("--{}", name),
            CommandArg::Named(name, value) | CommandArg::Secret(name, value) => {
                format!("--{}={}", name, value)
            }
            CommandArg::Positional(value) => value.clone(),
        }
    }
}

impl std::fmt::Display for CommandArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandArg::Secret(name, _) => write!(f, "--{}=***", name),
            other => f.write_str(&other.to_arg()),
        }
    }
}

/// Named operation plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    pub args: Vec<CommandArg>,
}

impl CommandInvocation {
    pub fn new(command: impl Into<String>, args: Vec<CommandArg>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().map(CommandArg::to_arg))
            .collect()
    }
}

impl std::fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured text and completion code. `0` is the only success value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            text: text.into(),
            exit_code,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}
