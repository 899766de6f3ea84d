//! Exporting an environment to a portable manifest and rebuilding it
//! elsewhere.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use gove_domain::{EnvironmentManifest, PackageManifest, SENTINEL_REVISION};
use tracing::{debug, info, warn};

use crate::effects::{Effects, OutputSink};
use crate::environment::{template_dir, Environment, ExecContext};
use crate::errors::GoveError;
use crate::scanner::scan_packages;
use crate::toolchain::{build::tool_binary, ToolchainCache};

/// Snapshots `env`: the linked toolchain plus every pinned package.
///
/// # Errors
/// Returns [`GoveError::MissingToolchainLink`] when the environment has no
/// toolchain, or the first revision query failure.
pub fn export(env: &Environment, effects: &dyn Effects) -> Result<EnvironmentManifest> {
    let toolchain_version = env.toolchain_version()?;
    let packages = scan_packages(env.workspace(), effects.vcs())?;
    debug!(environment = %env.name(), packages = packages.len(), "scanned workspace");
    Ok(EnvironmentManifest::new(
        env.name(),
        env.root().display().to_string(),
        toolchain_version,
        packages,
    )?)
}

#[derive(Clone, Debug, Default)]
pub struct ReplayOptions {
    pub prompt: Option<String>,
    /// Replace an existing environment of the same name.
    pub force: bool,
    /// Stream tool output while cloning and building.
    pub verbose: bool,
    /// `PATH` the package builds extend.
    pub base_path: Option<OsString>,
}

#[derive(Clone, Debug)]
pub struct ReplayReport {
    pub environment: Environment,
    pub toolchain: PathBuf,
    pub packages: usize,
    pub built: usize,
}

/// Rebuilds the environment described by `manifest` under `home`.
///
/// The toolchain is installed first when the cache lacks it. Every package
/// is cloned at its pinned revision and built with the environment's
/// toolchain. Any failure after the environment directory appears removes
/// it again.
///
/// # Errors
/// Returns [`GoveError::EnvironmentExists`] unless `force` is set, or the
/// first toolchain, clone or build failure.
pub fn replay(
    manifest: &EnvironmentManifest,
    home: &Path,
    options: &ReplayOptions,
    cache: &ToolchainCache,
    effects: &dyn Effects,
) -> Result<ReplayReport> {
    manifest.validate()?;
    let env = Environment::create(home, &manifest.name, options.prompt.as_deref());
    if env.exists() && !options.force {
        return Err(GoveError::EnvironmentExists {
            name: manifest.name.clone(),
        }
        .into());
    }

    let sink = options.verbose.then(|| effects.sink());
    let toolchain = cache.ensure_ready(&manifest.toolchain_version, effects.runner(), sink.as_ref())?;
    if env.exists() {
        info!(environment = %env.name(), "replacing existing environment");
        env.remove()?;
    }

    match populate(&env, manifest, home, options, cache, effects, sink.as_ref()) {
        Ok(built) => {
            info!(
                environment = %env.name(),
                packages = manifest.packages.len(),
                built,
                "environment imported"
            );
            Ok(ReplayReport {
                environment: env,
                toolchain,
                packages: manifest.packages.len(),
                built,
            })
        }
        Err(err) => {
            if let Err(cleanup) = env.remove() {
                warn!(
                    environment = %env.name(),
                    error = %cleanup,
                    "failed to remove partially imported environment"
                );
            }
            Err(err)
        }
    }
}

fn populate(
    env: &Environment,
    manifest: &EnvironmentManifest,
    home: &Path,
    options: &ReplayOptions,
    cache: &ToolchainCache,
    effects: &dyn Effects,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<usize> {
    env.generate(&template_dir(home))?;
    env.install(cache, &manifest.toolchain_version, effects.runner(), sink)?;
    let context = env.exec_context(options.base_path.clone())?;

    let mut built = 0;
    for package in &manifest.packages {
        if install_package(env, package, &context, effects, sink)? {
            built += 1;
        }
    }
    Ok(built)
}

/// Clones one package and builds it. Returns `false` when the build was
/// skipped for a sentinel checkout.
fn install_package(
    env: &Environment,
    package: &PackageManifest,
    context: &ExecContext,
    effects: &dyn Effects,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<bool> {
    let dest = env.workspace().join(&package.url);
    effects
        .vcs()
        .clone_at_revision(package.vcs, &package.url, &dest, &package.revision, sink)?;
    if package.revision == SENTINEL_REVISION {
        debug!(package = %package.url, "sentinel revision, build skipped");
        return Ok(false);
    }

    let go = tool_binary(env.toolchain_root()).display().to_string();
    let output = effects
        .runner()
        .run_with(&go, &["install".to_string()], context.envs(), &dest, sink)?;
    if !output.success() {
        return Err(GoveError::PackageBuild {
            package: package.url.clone(),
            detail: output.tail(),
        }
        .into());
    }
    debug!(package = %package.url, "package built");
    Ok(true)
}
