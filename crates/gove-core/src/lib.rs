#![deny(clippy::all, warnings)]

pub mod commands;
pub mod config;
pub mod context;
pub mod effects;
pub mod env_manifest;
pub mod environment;
pub mod errors;
pub mod outcome;
pub mod process;
pub mod scanner;
pub mod toolchain;
pub mod vcs;

pub(crate) mod fs;

#[cfg(test)]
mod test_support;

pub use crate::config::{Config, EnvSnapshot, GlobalOptions};
pub use crate::context::{CommandContext, CommandGroup, CommandInfo};
pub use crate::effects::{Effects, OutputSink, ProcessRunner, SharedEffects, SystemEffects, VcsAdapter};
pub use crate::environment::{Environment, ExecContext};
pub use crate::errors::{is_not_installed, GoveError};
pub use crate::outcome::{format_status_message, to_json_response, CommandStatus, ExecutionOutcome};
pub use crate::process::RunOutput;
pub use crate::toolchain::{AcquireRequest, InstallReport, ToolchainCache};

pub use gove_domain::{EnvironmentManifest, InstallMode, PackageManifest, VcsKind};
