use std::path::PathBuf;

use gove_domain::VcsKind;

/// Failures callers are expected to react to. Anything else travels as a
/// plain `anyhow::Error` with context attached.
#[derive(Debug, thiserror::Error)]
pub enum GoveError {
    #[error("{version} is not a supported version; you must download and compile it yourself")]
    UnsupportedVersion { version: String },
    #[error("toolchain {version} is not installed")]
    NotInstalled { version: String },
    #[error("fingerprint mismatch for {subject}: expected {expected} got {actual}")]
    Integrity {
        subject: String,
        expected: String,
        actual: String,
    },
    #[error("toolchain {version} failed its integrity check ({})", path.display())]
    ManifestIntegrity { version: String, path: PathBuf },
    #[error("toolchain {version} wasn't compiled properly: {detail}")]
    BuildFailed { version: String, detail: String },
    #[error("toolchain {version} is linked by the active environment {environment}")]
    VersionInUse { version: String, environment: String },
    #[error("`{version}` is not a valid toolchain version name")]
    InvalidVersionName { version: String },

    #[error("environment {name} already exists")]
    EnvironmentExists { name: String },
    #[error("environment {name} does not exist")]
    EnvironmentMissing { name: String },
    #[error("environment {name} is currently active")]
    ActiveEnvironment { name: String },
    #[error("environment {name} is not linked to any toolchain")]
    MissingToolchainLink { name: String },
    #[error("{} already exists", path.display())]
    ManifestExists { path: PathBuf },
    #[error("`{name}` is not a valid environment name")]
    InvalidEnvironmentName { name: String },
    #[error("`{name}` is not a plain file name")]
    InvalidManifestName { name: String },
    #[error("building package {package} failed: {detail}")]
    PackageBuild { package: String, detail: String },

    #[error("{vcs} could not read the revision of {}: {detail}", path.display())]
    VcsQuery {
        vcs: VcsKind,
        path: PathBuf,
        detail: String,
    },
    #[error("{vcs} could not fetch {locator} at {revision}: {detail}")]
    VcsClone {
        vcs: VcsKind,
        locator: String,
        revision: String,
        detail: String,
    },
}

impl GoveError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GoveError::UnsupportedVersion { .. } => "GOVE101",
            GoveError::NotInstalled { .. } => "GOVE102",
            GoveError::Integrity { .. } => "GOVE103",
            GoveError::ManifestIntegrity { .. } => "GOVE104",
            GoveError::BuildFailed { .. } => "GOVE105",
            GoveError::VersionInUse { .. } => "GOVE106",
            GoveError::InvalidVersionName { .. } => "GOVE107",
            GoveError::EnvironmentExists { .. } => "GOVE201",
            GoveError::EnvironmentMissing { .. } => "GOVE202",
            GoveError::ActiveEnvironment { .. } => "GOVE203",
            GoveError::MissingToolchainLink { .. } => "GOVE204",
            GoveError::ManifestExists { .. } => "GOVE205",
            GoveError::PackageBuild { .. } => "GOVE206",
            GoveError::InvalidEnvironmentName { .. } => "GOVE207",
            GoveError::InvalidManifestName { .. } => "GOVE208",
            GoveError::VcsQuery { .. } => "GOVE301",
            GoveError::VcsClone { .. } => "GOVE302",
        }
    }

    /// Follow-up command suggested to the operator, when one exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            GoveError::UnsupportedVersion { .. } | GoveError::InvalidVersionName { .. } => {
                Some("run `gove list --available` to see installable versions".to_string())
            }
            GoveError::InvalidEnvironmentName { .. } => Some(
                "environment names are a single path component without a leading dot".to_string(),
            ),
            GoveError::InvalidManifestName { .. } => {
                Some("pass a file name such as gove.manifest".to_string())
            }
            GoveError::NotInstalled { version } => Some(format!("run `gove install {version}`")),
            GoveError::ManifestIntegrity { version, .. } => {
                Some(format!("run `gove install --force {version}` to reinstall it"))
            }
            GoveError::BuildFailed { .. } => {
                Some("re-run with --verbose to see the build output".to_string())
            }
            GoveError::VersionInUse { .. } | GoveError::ActiveEnvironment { .. } => {
                Some("deactivate the environment first".to_string())
            }
            GoveError::EnvironmentExists { .. } | GoveError::ManifestExists { .. } => {
                Some("pass --force to replace it".to_string())
            }
            GoveError::EnvironmentMissing { .. } => {
                Some("run `gove lsenvs` to see available environments".to_string())
            }
            GoveError::MissingToolchainLink { name } => {
                Some(format!("run `gove migrate {name} <version>` to link a toolchain"))
            }
            GoveError::Integrity { .. }
            | GoveError::PackageBuild { .. }
            | GoveError::VcsQuery { .. }
            | GoveError::VcsClone { .. } => None,
        }
    }

    /// Whether the operator can fix this by changing their input.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GoveError::UnsupportedVersion { .. }
                | GoveError::NotInstalled { .. }
                | GoveError::VersionInUse { .. }
                | GoveError::EnvironmentExists { .. }
                | GoveError::EnvironmentMissing { .. }
                | GoveError::ActiveEnvironment { .. }
                | GoveError::MissingToolchainLink { .. }
                | GoveError::ManifestExists { .. }
                | GoveError::InvalidVersionName { .. }
                | GoveError::InvalidEnvironmentName { .. }
                | GoveError::InvalidManifestName { .. }
        )
    }
}

/// True when `err` is, or wraps, [`GoveError::NotInstalled`].
#[must_use]
pub fn is_not_installed(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<GoveError>(),
        Some(GoveError::NotInstalled { .. })
    )
}
