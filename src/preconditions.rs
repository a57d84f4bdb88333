//! Gate checks run before the configure step touches anything.
//!
//! Checks run in [`Precondition::ORDER`] and stop at the first failure, which
//! is reported as a single warning. The database probe is last, so nothing
//! is opened unless every cheaper check passed.

use std::path::Path;
use std::sync::Arc;

use crate::accessor::{self, ConfigAccessor};
use crate::database::DatabaseProbe;
use crate::errors::StepFailure;
use crate::overlay::{self, ConfigOverlay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    AppsDirWritable,
    CacheDirWritable,
    ConfigFileExists,
    ConfigFileWritable,
    ProjectKeyPresent,
    UrlPresent,
    ConnectionPresent,
    DatabaseReachable,
}

impl Precondition {
    pub const ORDER: [Precondition; 8] = [
        Precondition::AppsDirWritable,
        Precondition::CacheDirWritable,
        Precondition::ConfigFileExists,
        Precondition::ConfigFileWritable,
        Precondition::ProjectKeyPresent,
        Precondition::UrlPresent,
        Precondition::ConnectionPresent,
        Precondition::DatabaseReachable,
    ];
}

/// Inputs the checks look at.
pub struct CheckTarget<'a> {
    pub config_file: &'a Path,
    pub overlay: &'a ConfigOverlay,
    pub config: &'a dyn ConfigAccessor,
}

impl CheckTarget<'_> {
    fn file_name(&self) -> String {
        self.config_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.config_file.display().to_string())
    }
}

/// Whether the installer may write to a path.
pub trait WriteAccess: Send + Sync {
    fn is_writable(&self, path: &Path) -> bool;
}

/// Permissions of the running process, see [`is_writable`].
pub struct ProcessAccess;

impl WriteAccess for ProcessAccess {
    fn is_writable(&self, path: &Path) -> bool {
        is_writable(path)
    }
}

pub struct PreconditionChecker {
    probe: Arc<dyn DatabaseProbe>,
    access: Arc<dyn WriteAccess>,
}

impl PreconditionChecker {
    pub fn new(probe: Arc<dyn DatabaseProbe>) -> Self {
        Self {
            probe,
            access: Arc::new(ProcessAccess),
        }
    }

    pub fn with_access(mut self, access: Arc<dyn WriteAccess>) -> Self {
        self.access = access;
        self
    }

    /// Run every check. `Err` carries the warning of the first failed check.
    pub async fn check(&self, target: &CheckTarget<'_>) -> Result<(), StepFailure> {
        for precondition in Precondition::ORDER {
            if let Some(warning) = self.evaluate(precondition, target).await {
                tracing::warn!(?precondition, "precondition failed");
                return Err(StepFailure::Precondition(warning));
            }
        }
        Ok(())
    }

    /// `None` when the check passes, the warning text otherwise.
    async fn evaluate(&self, precondition: Precondition, target: &CheckTarget<'_>) -> Option<String> {
        match precondition {
            Precondition::AppsDirWritable => self.dir_writable(target.config, accessor::APPS_DIR),
            Precondition::CacheDirWritable => self.dir_writable(target.config, accessor::CACHE_DIR),
            Precondition::ConfigFileExists => (!target.config_file.is_file()).then(|| {
                format!(
                    "It looks like the <code>{}</code> file does not exist",
                    target.file_name()
                )
            }),
            Precondition::ConfigFileWritable => (!self.access.is_writable(target.config_file)).then(|| {
                format!(
                    "It looks like the <code>{}</code> file is not writable",
                    target.file_name()
                )
            }),
            Precondition::ProjectKeyPresent => target
                .overlay
                .value(overlay::PROJECT_KEY)
                .is_empty()
                .then(|| "Project key must contain a value".to_string()),
            Precondition::UrlPresent => target
                .overlay
                .value(overlay::URL)
                .is_empty()
                .then(|| "Url must contain a value".to_string()),
            Precondition::ConnectionPresent => target
                .overlay
                .value(overlay::CONNECTION)
                .is_empty()
                .then(|| "Database connection must contain a value".to_string()),
            Precondition::DatabaseReachable => {
                let reachable = self
                    .database_reachable(target.overlay.value(overlay::CONNECTION))
                    .await;
                (!reachable).then(|| "Could not connect to database".to_string())
            }
        }
    }

    fn dir_writable(&self, config: &dyn ConfigAccessor, key: &str) -> Option<String> {
        let dir = config.get(key).unwrap_or_default();
        let path = Path::new(&dir);
        if !dir.is_empty() && path.is_dir() && self.access.is_writable(path) {
            None
        } else {
            Some(format!(
                "It looks like the dir <code>{}</code> is not writable",
                dir
            ))
        }
    }

    async fn database_reachable(&self, dsn: &str) -> bool {
        let params = match self.probe.parse(dsn) {
            Ok(params) => params,
            Err(e) => {
                tracing::info!(error = %e, "connection string rejected");
                return false;
            }
        };
        match self.probe.connect(&params).await {
            Ok(()) => true,
            Err(e) => {
                tracing::info!(error = %e, "database probe failed");
                false
            }
        }
    }
}

/// Whether the current process may write to `path`. Checked with
/// `access(2)`, so nothing is created or opened for writing.
#[cfg(unix)]
pub fn is_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
pub fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}
