mod env;
mod manifest;
mod toolchain;

pub use env::{
    lsenvs, migrate, mkenv, rmenv, LsenvsRequest, MigrateRequest, MkenvRequest, RmenvRequest,
};
pub use manifest::{export, import, ExportRequest, ImportRequest, DEFAULT_MANIFEST_NAME};
pub use toolchain::{install, list, uninstall, InstallRequest, ListRequest, UninstallRequest};

use anyhow::Result;
use gove_domain::is_environment_name;

use crate::context::CommandContext;
use crate::errors::GoveError;
use crate::outcome::ExecutionOutcome;

/// Turns known failures into outcomes; anything else stays an error.
fn recover(result: Result<ExecutionOutcome>) -> Result<ExecutionOutcome> {
    match result {
        Err(err) if err.downcast_ref::<GoveError>().is_some() => {
            Ok(ExecutionOutcome::from_error(&err))
        }
        other => other,
    }
}

/// Environment names must stay a single entry of the tool home.
fn check_environment_name(name: &str) -> Result<()> {
    if !is_environment_name(name) {
        return Err(GoveError::InvalidEnvironmentName {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

fn ensure_inactive(ctx: &CommandContext, name: &str) -> Result<()> {
    if ctx.active_environment().as_deref() == Some(name) {
        return Err(GoveError::ActiveEnvironment {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}
