use anyhow::Result;
use gove_domain::InstallMode;
use serde_json::json;

use super::recover;
use crate::context::CommandContext;
use crate::errors::GoveError;
use crate::outcome::ExecutionOutcome;
use crate::toolchain::AcquireRequest;

#[derive(Clone, Debug)]
pub struct InstallRequest {
    pub version: String,
    pub mode: InstallMode,
    pub force: bool,
}

#[derive(Clone, Debug)]
pub struct UninstallRequest {
    pub version: String,
}

#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    pub installed_only: bool,
    pub available_only: bool,
}

/// Installs a toolchain version into the cache.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn install(ctx: &CommandContext, request: &InstallRequest) -> Result<ExecutionOutcome> {
    recover(install_outcome(ctx, request))
}

fn install_outcome(ctx: &CommandContext, request: &InstallRequest) -> Result<ExecutionOutcome> {
    let sink = ctx.sink();
    let report = ctx.cache().install(
        &AcquireRequest {
            version: request.version.clone(),
            mode: request.mode,
            force: request.force,
        },
        ctx.effects().runner(),
        sink.as_ref(),
    )?;
    let message = if report.already_installed {
        format!("{} is already installed", report.name)
    } else {
        format!("installed {} ({} files verified)", report.name, report.files)
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "version": report.name,
            "mode": report.mode.to_string(),
            "path": report.path.display().to_string(),
            "files": report.files,
            "already_installed": report.already_installed,
        }),
    ))
}

/// Removes a toolchain version unless the active environment links to it.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn uninstall(ctx: &CommandContext, request: &UninstallRequest) -> Result<ExecutionOutcome> {
    recover(uninstall_outcome(ctx, request))
}

fn uninstall_outcome(ctx: &CommandContext, request: &UninstallRequest) -> Result<ExecutionOutcome> {
    if let Some(active) = ctx.active_environment() {
        let linked = ctx.environment(&active, None).toolchain_version().ok();
        if linked.as_deref() == Some(request.version.as_str()) {
            return Err(GoveError::VersionInUse {
                version: request.version.clone(),
                environment: active,
            }
            .into());
        }
    }
    let path = ctx.cache().uninstall(&request.version)?;
    Ok(ExecutionOutcome::success(
        format!("removed {}", request.version),
        json!({
            "version": request.version,
            "path": path.display().to_string(),
        }),
    ))
}

/// Lists installed versions and the ones that could be installed.
///
/// # Errors
/// Returns an error if the cache cannot be listed.
pub fn list(ctx: &CommandContext, request: &ListRequest) -> Result<ExecutionOutcome> {
    recover(list_outcome(ctx, request))
}

fn list_outcome(ctx: &CommandContext, request: &ListRequest) -> Result<ExecutionOutcome> {
    let cache = ctx.cache();
    let installed = if request.available_only {
        Vec::new()
    } else {
        cache.installed()?
    };
    let available = if request.installed_only {
        Vec::new()
    } else {
        cache.available(ctx.effects().runner())?
    };

    let mut lines = Vec::new();
    if !request.available_only {
        lines.push("Installed".to_string());
        lines.extend(installed.iter().map(|name| format!("    {name}")));
    }
    if !request.installed_only {
        lines.push("Available for installation".to_string());
        lines.extend(available.iter().map(|name| format!("    {name}")));
    }
    Ok(ExecutionOutcome::success(
        lines.join("\n"),
        json!({
            "installed": installed,
            "available": available,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::config::GlobalOptions;
    use crate::environment::tests::seed_version;
    use crate::fs::replace_dir_link;
    use crate::outcome::CommandStatus;
    use tempfile::tempdir;

    #[test]
    fn unknown_source_version_is_a_user_error() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        let outcome = install(
            &ctx,
            &InstallRequest {
                version: "0.1".into(),
                mode: InstallMode::Source,
                force: false,
            },
        )
        .expect("outcome");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["code"], "GOVE101");
        assert!(!temp.path().join("cache/0.1").exists());
    }

    #[test]
    fn verified_install_is_reported_once() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        seed_version(ctx.cache(), "1.3.2");
        let outcome = install(
            &ctx,
            &InstallRequest {
                version: "1.3.2".into(),
                mode: InstallMode::Source,
                force: false,
            },
        )
        .expect("outcome");
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert_eq!(outcome.details["already_installed"], true);

        let listing = list(&ctx, &ListRequest::default()).expect("list");
        assert_eq!(listing.details["installed"], json!(["1.3.2"]));
        assert!(listing.details["available"]
            .as_array()
            .expect("array")
            .iter()
            .all(|name| name != "1.3.2"));
    }

    #[cfg(unix)]
    #[test]
    fn uninstall_refuses_the_active_toolchain() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), Some("dev"));
        let target = seed_version(ctx.cache(), "1.3.2");
        replace_dir_link(&target, &temp.path().join("home/dev/lib")).expect("link");

        let outcome = uninstall(
            &ctx,
            &UninstallRequest {
                version: "1.3.2".into(),
            },
        )
        .expect("outcome");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["code"], "GOVE106");
        assert!(target.is_dir());

        let idle = context(&global, temp.path(), None);
        let outcome = uninstall(
            &idle,
            &UninstallRequest {
                version: "1.3.2".into(),
            },
        )
        .expect("outcome");
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert!(!target.exists());
    }
}
