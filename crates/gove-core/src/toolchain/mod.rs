//! Cached toolchain installations under the cache root.
//!
//! Each installed version lives in `<root>/<name>` where `name` is the
//! canonical directory name for its install mode. A version is ready once
//! its integrity manifest has been written; anything short of that is
//! removed on failure.

pub mod integrity;

pub(crate) mod build;
pub(crate) mod download;
mod git;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gove_domain::{
    archive_name, binary_version_name, host_platform, is_toolchain_name, normalize_tag,
    release_url, FingerprintTable, HostPlatform, InstallMode,
};
use tracing::{debug, info, warn};

use crate::config::{BuildConfig, Config, NetworkConfig};
use crate::effects::{OutputSink, ProcessRunner};
use crate::errors::GoveError;
use crate::fs::{copy_tree, remove_dir_all_writable};

pub use integrity::{Verification, MANIFEST_FILE};

#[derive(Clone, Debug)]
pub struct AcquireRequest {
    pub version: String,
    pub mode: InstallMode,
    pub force: bool,
}

#[derive(Clone, Debug)]
pub struct InstallReport {
    pub name: String,
    pub mode: InstallMode,
    pub path: PathBuf,
    pub already_installed: bool,
    pub files: usize,
}

pub struct ToolchainCache {
    root: PathBuf,
    fingerprints: FingerprintTable,
    network: NetworkConfig,
    build: BuildConfig,
    platform: Option<HostPlatform>,
}

impl ToolchainCache {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.paths().cache.clone(),
            FingerprintTable::builtin(),
            config.network().clone(),
            config.build().clone(),
            host_platform(),
        )
    }

    #[must_use]
    pub fn new(
        root: PathBuf,
        fingerprints: FingerprintTable,
        network: NetworkConfig,
        build: BuildConfig,
        platform: Option<HostPlatform>,
    ) -> Self {
        Self {
            root,
            fingerprints,
            network,
            build,
            platform,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn fingerprints(&self) -> &FingerprintTable {
        &self.fingerprints
    }

    /// Joins `name` onto the cache root without checking it; callers that
    /// take names from users go through [`Self::checked_path`].
    #[must_use]
    pub fn content_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// # Errors
    /// Returns [`GoveError::InvalidVersionName`] unless `name` is a single
    /// visible, non-reserved entry of the cache root.
    pub fn checked_path(&self, name: &str) -> Result<PathBuf> {
        if !is_toolchain_name(name) {
            return Err(GoveError::InvalidVersionName {
                version: name.to_string(),
            }
            .into());
        }
        Ok(self.content_path(name))
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        is_toolchain_name(name) && self.content_path(name).is_dir()
    }

    #[must_use]
    pub fn is_compiled(&self, name: &str) -> bool {
        is_toolchain_name(name) && build::tool_binary(&self.content_path(name)).is_file()
    }

    fn git_repo(&self) -> PathBuf {
        self.root.join("git")
    }

    fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Canonical cache directory name for what the user typed.
    ///
    /// # Errors
    /// Returns [`GoveError::InvalidVersionName`] when the name would leave
    /// the cache root, or an error for binary installs on a platform
    /// without releases.
    pub fn resolve_name(&self, version: &str, mode: InstallMode) -> Result<String> {
        let version = version.trim();
        let name = match mode {
            InstallMode::Git => normalize_tag(version),
            InstallMode::Source => version.trim_start_matches("go").to_string(),
            InstallMode::Binary => {
                let numeric = version.trim_start_matches("go");
                if self.fingerprints.is_binary(numeric) {
                    numeric.to_string()
                } else {
                    let platform = self.platform.ok_or_else(|| {
                        anyhow!("prebuilt toolchains are not published for this platform")
                    })?;
                    binary_version_name(numeric, &platform)
                }
            }
        };
        self.checked_path(&name)?;
        Ok(name)
    }

    /// # Errors
    /// Returns [`GoveError::InvalidVersionName`] for names outside the cache,
    /// or an error if the manifest exists but cannot be read.
    pub fn verify(&self, name: &str) -> Result<Verification> {
        let path = self.checked_path(name)?;
        if !path.is_dir() {
            return Ok(Verification::Unverified);
        }
        integrity::verify_manifest(&path)
    }

    /// True only when every manifest line still matches its file.
    ///
    /// # Errors
    /// Returns an error if the manifest exists but cannot be read.
    pub fn freshness_check(&self, name: &str) -> Result<bool> {
        Ok(self.verify(name)? == Verification::Verified)
    }

    /// # Errors
    /// Returns an error if the version is absent or the tree cannot be hashed.
    pub fn generate_manifest(&self, name: &str) -> Result<usize> {
        let path = self.checked_path(name)?;
        if !path.is_dir() {
            return Err(GoveError::NotInstalled {
                version: name.to_string(),
            }
            .into());
        }
        integrity::generate_manifest(&path)
    }

    /// # Errors
    /// Returns [`GoveError::BuildFailed`] when the build script fails or
    /// produces no `go` binary.
    pub fn compile(
        &self,
        name: &str,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<()> {
        build::compile(
            name,
            &self.checked_path(name)?,
            &self.logs_dir(),
            &self.build,
            runner,
            sink,
        )
    }

    /// Fetches a version's content into the cache and returns its directory
    /// name. Existing content is kept unless `force` is set.
    ///
    /// # Errors
    /// Returns [`GoveError::UnsupportedVersion`] for unknown versions and
    /// [`GoveError::Integrity`] when a download's fingerprint does not match.
    pub fn acquire(
        &self,
        request: &AcquireRequest,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<String> {
        let name = self.resolve_name(&request.version, request.mode)?;
        let dest = self.content_path(&name);
        if dest.exists() {
            if !request.force {
                debug!(version = %name, "content already present");
                return Ok(name);
            }
            info!(version = %name, "removing existing install");
            remove_dir_all_writable(&dest)?;
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        match request.mode {
            InstallMode::Git => self.acquire_from_git(&name, &dest, runner, sink)?,
            InstallMode::Source | InstallMode::Binary => {
                self.acquire_archive(&name, request.mode, &dest)?;
            }
        }
        Ok(name)
    }

    fn acquire_archive(&self, name: &str, mode: InstallMode, dest: &Path) -> Result<()> {
        let known = match mode {
            InstallMode::Binary => self.fingerprints.is_binary(name),
            _ => self.fingerprints.is_source(name),
        };
        let expected = self
            .fingerprints
            .lookup(name)
            .ok()
            .filter(|_| known)
            .ok_or_else(|| GoveError::UnsupportedVersion {
                version: name.to_string(),
            })?;

        let platform = self.platform_for(mode)?;
        let archive = archive_name(name, mode, &platform);
        let url = release_url(
            &self.network.download_url,
            &self.network.legacy_download_url,
            name,
            &archive,
        );
        info!(version = %name, %url, "downloading toolchain");
        let client = download::build_http_client(&self.network)?;
        let downloaded = download::download_to_temp(&client, &url)?;
        let actual = download::sha1_file(downloaded.path())?;
        if actual != expected {
            return Err(GoveError::Integrity {
                subject: archive,
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
        debug!(version = %name, sha1 = %actual, "fingerprint verified");

        let stage = self.stage_dir()?;
        download::extract_archive(
            downloaded.path(),
            stage.path(),
            download::ArchiveKind::from_name(&archive),
        )?;
        promote(stage.path(), dest)
    }

    fn acquire_from_git(
        &self,
        tag: &str,
        dest: &Path,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<()> {
        let repo = self.git_repo();
        git::sync_repo(&repo, &self.network.git_repo, runner, sink)?;
        if !git::is_moving_name(tag) {
            let tags = git::list_tags(&repo, runner)?;
            if !tags.iter().any(|known| known == tag) {
                return Err(GoveError::UnsupportedVersion {
                    version: tag.to_string(),
                }
                .into());
            }
        }
        git::checkout(&repo, tag, runner, sink)?;

        let stage = self.stage_dir()?;
        copy_tree(&repo, stage.path(), &[".git"])?;
        promote(stage.path(), dest)
    }

    fn platform_for(&self, mode: InstallMode) -> Result<HostPlatform> {
        match (self.platform, mode) {
            (Some(platform), _) => Ok(platform),
            (None, InstallMode::Binary) => Err(anyhow!(
                "prebuilt toolchains are not published for this platform"
            )),
            (None, _) => Ok(HostPlatform {
                os: std::env::consts::OS,
                arch: std::env::consts::ARCH,
            }),
        }
    }

    fn stage_dir(&self) -> Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix(".stage-")
            .tempdir_in(&self.root)
            .with_context(|| {
                format!(
                    "failed to create a staging directory in {}",
                    self.root.display()
                )
            })
    }

    /// Acquires, compiles when needed and writes the integrity manifest.
    /// Nothing is left behind when any step fails.
    ///
    /// # Errors
    /// Returns [`GoveError::ManifestIntegrity`] when an existing install is
    /// corrupt and `force` is not set, or the first acquisition/build error.
    pub fn install(
        &self,
        request: &AcquireRequest,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<InstallReport> {
        let name = self.resolve_name(&request.version, request.mode)?;
        let path = self.content_path(&name);
        let report = |already_installed, files| InstallReport {
            name: name.clone(),
            mode: request.mode,
            path: path.clone(),
            already_installed,
            files,
        };

        if path.exists() && !request.force {
            match self.verify(&name)? {
                Verification::Verified => return Ok(report(true, 0)),
                Verification::Mismatch(file) => {
                    return Err(GoveError::ManifestIntegrity {
                        version: name.clone(),
                        path: file,
                    }
                    .into())
                }
                Verification::Unverified => {
                    warn!(version = %name, "removing unfinished install");
                    remove_dir_all_writable(&path)?;
                }
            }
        }

        match self.acquire_and_build(request, runner, sink) {
            Ok(files) => Ok(report(false, files)),
            Err(err) => {
                if let Err(cleanup) = remove_dir_all_writable(&path) {
                    warn!(path = %path.display(), error = %cleanup, "failed to remove partial install");
                }
                Err(err)
            }
        }
    }

    fn acquire_and_build(
        &self,
        request: &AcquireRequest,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<usize> {
        let name = self.acquire(request, runner, sink)?;
        if request.mode.needs_compile() {
            self.compile(&name, runner, sink)?;
        }
        let files = self.generate_manifest(&name)?;
        info!(version = %name, files, "toolchain ready");
        Ok(files)
    }

    /// Returns the content path of `name`, installing it first when it is
    /// not ready. The install mode is inferred from the name.
    ///
    /// # Errors
    /// Propagates acquisition, build and integrity failures.
    pub fn ensure_ready(
        &self,
        name: &str,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<PathBuf> {
        if self.freshness_check(name)? {
            return Ok(self.content_path(name));
        }
        let request = AcquireRequest {
            version: name.to_string(),
            mode: InstallMode::infer(name, &self.fingerprints),
            force: false,
        };
        Ok(self.install(&request, runner, sink)?.path)
    }

    /// Version directories present in the cache.
    ///
    /// # Errors
    /// Returns an error if the cache root exists but cannot be listed.
    pub fn installed(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to list {}", self.root.display()))
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to list {}", self.root.display()))?;
            if !entry.file_type().is_ok_and(|kind| kind.is_dir()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                continue;
            };
            if !is_toolchain_name(&name) {
                continue;
            }
            if self.is_known_name(&name) || entry.path().join(MANIFEST_FILE).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_known_name(&self, name: &str) -> bool {
        self.fingerprints.is_source(name)
            || self.fingerprints.is_binary(name)
            || git::is_moving_name(name)
            || name.starts_with("go1")
            || name.starts_with("release.")
    }

    /// Release tags from the local upstream clone, empty when there is none.
    ///
    /// # Errors
    /// Returns [`GoveError::VcsQuery`] when `git tag` fails.
    pub fn tags(&self, runner: &dyn ProcessRunner) -> Result<Vec<String>> {
        git::list_tags(&self.git_repo(), runner)
    }

    /// Every known name that is not installed yet.
    ///
    /// # Errors
    /// Propagates listing failures.
    pub fn available(&self, runner: &dyn ProcessRunner) -> Result<Vec<String>> {
        let installed: BTreeSet<String> = self.installed()?.into_iter().collect();
        let mut known: BTreeSet<String> = self.tags(runner)?.into_iter().collect();
        known.extend(self.fingerprints.sources().map(ToString::to_string));
        known.extend(self.fingerprints.binaries().map(ToString::to_string));
        Ok(known.difference(&installed).cloned().collect())
    }

    /// # Errors
    /// Returns [`GoveError::NotInstalled`] when the version is absent.
    pub fn uninstall(&self, name: &str) -> Result<PathBuf> {
        let path = self.checked_path(name)?;
        if !path.is_dir() {
            return Err(GoveError::NotInstalled {
                version: name.to_string(),
            }
            .into());
        }
        remove_dir_all_writable(&path)?;
        info!(version = %name, "toolchain removed");
        Ok(path)
    }
}

/// Moves a finished staging tree into its version directory.
fn promote(stage: &Path, dest: &Path) -> Result<()> {
    fs::rename(stage, dest).with_context(|| {
        format!(
            "failed to move {} into {}",
            stage.display(),
            dest.display()
        )
    })
}
