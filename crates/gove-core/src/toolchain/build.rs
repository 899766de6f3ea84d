use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::effects::{OutputSink, ProcessRunner};
use crate::errors::GoveError;

#[cfg(windows)]
pub(crate) const BUILD_SCRIPT: &str = "make.bat";
#[cfg(not(windows))]
pub(crate) const BUILD_SCRIPT: &str = "make.bash";

#[cfg(windows)]
const TOOL_BINARY: &str = "go.exe";
#[cfg(not(windows))]
const TOOL_BINARY: &str = "go";

/// Location of the compiled `go` tool inside a toolchain root.
pub(crate) fn tool_binary(root: &Path) -> std::path::PathBuf {
    root.join("bin").join(TOOL_BINARY)
}

/// Runs the platform build script under `root/src` and checks the result.
pub(crate) fn compile(
    version: &str,
    root: &Path,
    logs: &Path,
    build: &BuildConfig,
    runner: &dyn ProcessRunner,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<()> {
    let src = root.join("src");
    let script = src.join(BUILD_SCRIPT);
    if !script.is_file() {
        return Err(GoveError::BuildFailed {
            version: version.to_string(),
            detail: format!("{} not found", script.display()),
        }
        .into());
    }

    let mut envs = vec![("GOROOT_FINAL".to_string(), root.display().to_string())];
    if build.no_cgo {
        envs.push(("CGO_ENABLED".to_string(), "0".to_string()));
    }
    if let Some(bootstrap) = &build.bootstrap {
        envs.push(("GOROOT_BOOTSTRAP".to_string(), bootstrap.display().to_string()));
    }

    info!(%version, "compiling toolchain");
    let program = script.display().to_string();
    let output = runner.run_with(&program, &[], &envs, &src, sink)?;
    write_build_log(logs, version, &output.stdout, &output.stderr);
    if !output.success() {
        return Err(GoveError::BuildFailed {
            version: version.to_string(),
            detail: output.tail(),
        }
        .into());
    }

    let binary = tool_binary(root);
    if !binary.is_file() {
        return Err(GoveError::BuildFailed {
            version: version.to_string(),
            detail: format!("{} is missing after the build", binary.display()),
        }
        .into());
    }
    debug!(%version, binary = %binary.display(), "toolchain compiled");
    Ok(())
}

fn write_build_log(logs: &Path, version: &str, stdout: &str, stderr: &str) {
    let result = fs::create_dir_all(logs)
        .and_then(|()| fs::write(logs.join(format!("{version}.log")), format!("{stdout}{stderr}")))
        .with_context(|| format!("failed to write build log under {}", logs.display()));
    if let Err(err) = result {
        debug!(error = %err, "build log skipped");
    }
}
