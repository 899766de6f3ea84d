use color_eyre::{eyre::eyre, Result};
use gove_core::commands::{
    self, ExportRequest, ImportRequest, InstallRequest, ListRequest, LsenvsRequest,
    MigrateRequest, MkenvRequest, RmenvRequest, UninstallRequest,
};
use gove_core::{CommandContext, CommandGroup, CommandInfo, ExecutionOutcome};

use crate::cli::CommandGroupCli;

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Install(args) => {
            let info = CommandInfo::new(CommandGroup::Install, "install");
            let request = InstallRequest {
                version: args.version.clone(),
                mode: args.mode.into(),
                force: args.force,
            };
            core_call(info, || commands::install(ctx, &request))
        }
        CommandGroupCli::Uninstall(args) => {
            let info = CommandInfo::new(CommandGroup::Uninstall, "uninstall");
            let request = UninstallRequest {
                version: args.version.clone(),
            };
            core_call(info, || commands::uninstall(ctx, &request))
        }
        CommandGroupCli::List(args) => {
            let info = CommandInfo::new(CommandGroup::List, "list");
            let request = ListRequest {
                installed_only: args.installed,
                available_only: args.available,
            };
            core_call(info, || commands::list(ctx, &request))
        }
        CommandGroupCli::Mkenv(args) => {
            let info = CommandInfo::new(CommandGroup::Mkenv, "mkenv");
            let request = MkenvRequest {
                name: args.name.clone(),
                version: args.version.clone(),
                prompt: args.prompt.clone(),
                force: args.force,
            };
            core_call(info, || commands::mkenv(ctx, &request))
        }
        CommandGroupCli::Rmenv(args) => {
            let info = CommandInfo::new(CommandGroup::Rmenv, "rmenv");
            let request = RmenvRequest {
                name: args.name.clone(),
            };
            core_call(info, || commands::rmenv(ctx, &request))
        }
        CommandGroupCli::Lsenvs => {
            let info = CommandInfo::new(CommandGroup::Lsenvs, "lsenvs");
            core_call(info, || commands::lsenvs(ctx, &LsenvsRequest))
        }
        CommandGroupCli::Migrate(args) => {
            let info = CommandInfo::new(CommandGroup::Migrate, "migrate");
            let request = MigrateRequest {
                name: args.name.clone(),
                version: args.version.clone(),
            };
            core_call(info, || commands::migrate(ctx, &request))
        }
        CommandGroupCli::Export(args) => {
            let info = CommandInfo::new(CommandGroup::Export, "export");
            let request = ExportRequest {
                environment: args.environment.clone(),
                name: args.name.clone(),
                prettify: args.prettify,
                force: args.force,
            };
            core_call(info, || commands::export(ctx, &request))
        }
        CommandGroupCli::Import(args) => {
            let info = CommandInfo::new(CommandGroup::Import, "import");
            let request = ImportRequest {
                manifest: args.manifest.clone(),
                prompt: args.prompt.clone(),
                force: args.force,
            };
            core_call(info, || commands::import(ctx, &request))
        }
    }
}

fn core_call<F>(info: CommandInfo, call: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    let outcome = call().map_err(|err| eyre!("{err:?}"))?;
    Ok((info, outcome))
}
