use anyhow::Result;
use serde_json::json;
use tracing::warn;

use super::{check_environment_name, ensure_inactive, recover};
use crate::context::CommandContext;
use crate::environment::{list_environments, template_dir};
use crate::errors::GoveError;
use crate::outcome::ExecutionOutcome;
use crate::toolchain::Verification;

#[derive(Clone, Debug)]
pub struct MkenvRequest {
    pub name: String,
    pub version: String,
    pub prompt: Option<String>,
    pub force: bool,
}

#[derive(Clone, Debug)]
pub struct RmenvRequest {
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct LsenvsRequest;

#[derive(Clone, Debug)]
pub struct MigrateRequest {
    pub name: String,
    pub version: String,
}

/// Creates an environment bound to an installed toolchain.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn mkenv(ctx: &CommandContext, request: &MkenvRequest) -> Result<ExecutionOutcome> {
    recover(mkenv_outcome(ctx, request))
}

fn mkenv_outcome(ctx: &CommandContext, request: &MkenvRequest) -> Result<ExecutionOutcome> {
    check_environment_name(&request.name)?;
    match ctx.cache().verify(&request.version)? {
        Verification::Verified => {}
        Verification::Mismatch(path) => {
            return Err(GoveError::ManifestIntegrity {
                version: request.version.clone(),
                path,
            }
            .into())
        }
        Verification::Unverified => {
            return Err(GoveError::NotInstalled {
                version: request.version.clone(),
            }
            .into())
        }
    }

    let env = ctx.environment(&request.name, request.prompt.as_deref());
    if env.exists() {
        if !request.force {
            return Err(GoveError::EnvironmentExists {
                name: request.name.clone(),
            }
            .into());
        }
        env.remove()?;
    }

    let sink = ctx.sink();
    let created = env.generate(&template_dir(ctx.home())).and_then(|_| {
        env.install(
            ctx.cache(),
            &request.version,
            ctx.effects().runner(),
            sink.as_ref(),
        )
    });
    let target = match created {
        Ok(target) => target,
        Err(err) => {
            if let Err(cleanup) = env.remove() {
                warn!(environment = %request.name, error = %cleanup, "failed to remove partial environment");
            }
            return Err(err);
        }
    };

    let activate = env.bin_dir().join("activate");
    Ok(ExecutionOutcome::success(
        format!(
            "created environment {} using {}",
            request.name, request.version
        ),
        json!({
            "environment": request.name,
            "path": env.root().display().to_string(),
            "version": request.version,
            "toolchain": target.display().to_string(),
            "activate": activate.display().to_string(),
        }),
    ))
}

/// Deletes an environment that is not active.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn rmenv(ctx: &CommandContext, request: &RmenvRequest) -> Result<ExecutionOutcome> {
    recover(rmenv_outcome(ctx, request))
}

fn rmenv_outcome(ctx: &CommandContext, request: &RmenvRequest) -> Result<ExecutionOutcome> {
    check_environment_name(&request.name)?;
    ensure_inactive(ctx, &request.name)?;
    let env = ctx.environment(&request.name, None);
    if !env.exists() {
        return Err(GoveError::EnvironmentMissing {
            name: request.name.clone(),
        }
        .into());
    }
    env.remove()?;
    Ok(ExecutionOutcome::success(
        format!("removed environment {}", request.name),
        json!({
            "environment": request.name,
            "path": env.root().display().to_string(),
        }),
    ))
}

/// Lists environments under the tool home.
///
/// # Errors
/// Returns an error if the home directory cannot be listed.
pub fn lsenvs(ctx: &CommandContext, _request: &LsenvsRequest) -> Result<ExecutionOutcome> {
    let listing = list_environments(ctx.home())?;
    let mut lines = vec!["Virtual Go Environments".to_string()];
    lines.extend(listing.available.iter().map(|name| format!("    {name}")));
    lines.extend(
        listing
            .invalid
            .iter()
            .map(|name| format!("    {name} (invalid)")),
    );
    let message = if listing.available.is_empty() && listing.invalid.is_empty() {
        "no environments".to_string()
    } else {
        lines.join("\n")
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "available": listing.available,
            "invalid": listing.invalid,
        }),
    ))
}

/// Points an environment at another installed toolchain.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn migrate(ctx: &CommandContext, request: &MigrateRequest) -> Result<ExecutionOutcome> {
    recover(migrate_outcome(ctx, request))
}

fn migrate_outcome(ctx: &CommandContext, request: &MigrateRequest) -> Result<ExecutionOutcome> {
    check_environment_name(&request.name)?;
    ensure_inactive(ctx, &request.name)?;
    let env = ctx.environment(&request.name, None);
    let previous = env.toolchain_version().ok();
    let changed = env.migrate(ctx.cache(), &request.version)?;
    let details = json!({
        "environment": request.name,
        "version": request.version,
        "previous": previous,
        "changed": changed,
    });
    if !changed {
        return Ok(ExecutionOutcome::success(
            format!("{} already uses {}", request.name, request.version),
            details,
        ));
    }
    let mut details = details;
    details["hint"] = json!("run `go build -a ./...` in $GOPATH to rebuild installed packages");
    Ok(ExecutionOutcome::success(
        format!("migrated {} to {}", request.name, request.version),
        details,
    ))
}
