//! Typed error hierarchy for the installer.
//!
//! The enums by subsystem:
//! - `CommandFault`: internal faults at the command runner boundary
//! - `DsnError` / `ProbeError`: database connection string and connectivity probe
//! - `ConfigStoreError`: reading or committing the application's config file
//! - `StepFailure`: the three failure classes a step handler reports
//! - `TransportError`: a sequencer could not get a response for a step
//!
//! None of these cross the request/response boundary: a handler folds its
//! `StepFailure` into a `StepOutcome` with a warning or danger message.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use webinstall_common::{Level, StepOutcome};

use crate::util::escape_html;

/// Faults raised while invoking an external operation.
#[derive(Debug, Error)]
pub enum CommandFault {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect output of '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' timed out after {} seconds", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DsnError {
    #[error("Connection string has no scheme")]
    MissingScheme,

    #[error("Unsupported database driver '{0}'")]
    UnsupportedDriver(String),

    #[error("Connection string has no host")]
    MissingHost,

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Connection string has no database path")]
    MissingPath,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error("Could not reach {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {address} timed out after {} seconds", .timeout.as_secs())]
    Timeout { address: String, timeout: Duration },

    #[error("Database directory {0} does not exist")]
    MissingDirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Client-side failure to obtain a step response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Could not reach the installer at {url}: {message}")]
    Request { url: String, message: String },

    #[error("Installer at {url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from the installer: {0}")]
    Decode(String),
}

/// Why a step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    /// A gate check did not pass. Recoverable by the user, nothing was changed.
    #[error("{0}")]
    Precondition(String),

    /// An invoked operation returned a non-zero code or faulted.
    #[error("{summary}")]
    ExternalOperation {
        summary: String,
        /// Manual fallback, already phrased as a sentence fragment.
        hint: Option<String>,
        output: String,
    },

    /// A write could not be committed.
    #[error("{0}")]
    Persistence(String),
}

impl StepFailure {
    pub fn level(&self) -> Level {
        match self {
            StepFailure::Precondition(_) => Level::Warning,
            StepFailure::ExternalOperation { .. } | StepFailure::Persistence(_) => Level::Danger,
        }
    }

    /// User-facing HTML message. Captured output is escaped and shown verbatim.
    pub fn message(&self) -> String {
        match self {
            StepFailure::Precondition(text) | StepFailure::Persistence(text) => text.clone(),
            StepFailure::ExternalOperation {
                summary,
                hint,
                output,
            } => {
                let hint = hint
                    .as_deref()
                    .map(|h| format!(", {}", h))
                    .unwrap_or_default();
                format!("{}{}<pre>{}</pre>", summary, hint, escape_html(output))
            }
        }
    }

    pub fn into_outcome(self) -> StepOutcome {
        StepOutcome {
            success: false,
            messages: Vec::new(),
        }
        .with(self.level(), self.message())
    }
}
