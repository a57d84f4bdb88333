use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One named unit of the installation sequence.
///
/// The variants are declared in execution order; [`InstallStep::ALL`] is the
/// fixed sequence every client walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStep {
    /// Write the overlay into the application's config file.
    Configure,
    /// Run the database migration.
    Migrate,
    /// Provision the administrator account.
    CreateAdmin,
    /// Install the default extension package.
    InstallPackage,
    /// Report the resolved URLs.
    Finish,
}

/// State reached once the corresponding step succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
    Configured,
    Migrated,
    AdminCreated,
    PackageInstalled,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown installation step '{0}'")]
pub struct UnknownStep(pub String);

impl InstallStep {
    pub const ALL: [InstallStep; 5] = [
        InstallStep::Configure,
        InstallStep::Migrate,
        InstallStep::CreateAdmin,
        InstallStep::InstallPackage,
        InstallStep::Finish,
    ];

    /// Wire name used in request paths.
    pub fn name(self) -> &'static str {
        match self {
            InstallStep::Configure => "configure",
            InstallStep::Migrate => "migrate",
            InstallStep::CreateAdmin => "create-admin",
            InstallStep::InstallPackage => "install-package",
            InstallStep::Finish => "finish",
        }
    }

    /// Method names of the browser installer this one replaces. Still
    /// accepted so existing front-ends keep working.
    pub fn legacy_name(self) -> &'static str {
        match self {
            InstallStep::Configure => "adjustEnvFile",
            InstallStep::Migrate => "executeFusioMigration",
            InstallStep::CreateAdmin => "createAdminUser",
            InstallStep::InstallPackage => "installBackendApp",
            InstallStep::Finish => "finishInstall",
        }
    }

    /// Progress label shown while the step is in flight.
    pub fn label(self) -> &'static str {
        match self {
            InstallStep::Configure => "Adjusting environment file ...",
            InstallStep::Migrate => "Executing database migration ...",
            InstallStep::CreateAdmin => "Creating admin user ...",
            InstallStep::InstallPackage => "Installing backend app ...",
            InstallStep::Finish => "Finishing installation ...",
        }
    }

    /// Zero-based ordinal within [`InstallStep::ALL`].
    pub fn position(self) -> usize {
        match self {
            InstallStep::Configure => 0,
            InstallStep::Migrate => 1,
            InstallStep::CreateAdmin => 2,
            InstallStep::InstallPackage => 3,
            InstallStep::Finish => 4,
        }
    }

    pub fn next(self) -> Option<InstallStep> {
        Self::ALL.get(self.position() + 1).copied()
    }

    pub fn reached_state(self) -> InstallState {
        match self {
            InstallStep::Configure => InstallState::Configured,
            InstallStep::Migrate => InstallState::Migrated,
            InstallStep::CreateAdmin => InstallState::AdminCreated,
            InstallStep::InstallPackage => InstallState::PackageInstalled,
            InstallStep::Finish => InstallState::Finished,
        }
    }

    /// Steps whose handler changes on-disk or database state.
    pub fn is_mutating(self) -> bool {
        !matches!(self, InstallStep::Finish)
    }

    pub fn descriptor(self) -> StepDescriptor {
        StepDescriptor {
            name: self.name().to_string(),
            label: self.label().to_string(),
            position: self.position(),
        }
    }
}

impl std::fmt::Display for InstallStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for InstallStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.name() == s || step.legacy_name() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

impl InstallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallState::Finished)
    }
}

impl std::fmt::Display for InstallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InstallState::Configured => "configured",
            InstallState::Migrated => "migrated",
            InstallState::AdminCreated => "admin-created",
            InstallState::PackageInstalled => "package-installed",
            InstallState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Public listing entry for `GET /api/steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub name: String,
    pub label: String,
    pub position: usize,
}
