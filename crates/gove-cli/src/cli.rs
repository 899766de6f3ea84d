use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand, ValueEnum};
use gove_core::InstallMode;

pub const GOVE_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\n{subcommands}\n\nGlobal options:\n{options}\n";

pub const GOVE_BEFORE_HELP: &str = concat!(
    "gove ",
    env!("CARGO_PKG_VERSION"),
    " – Isolated Go toolchain environments\n\n",
    "\x1b[1;36mToolchains\x1b[0m\n",
    "  install          Fetch, verify, and build a Go version into the cache.\n",
    "  uninstall        Remove a cached Go version.\n",
    "  list             Show installed versions and the ones that can be installed.\n\n",
    "\x1b[1;36mEnvironments\x1b[0m\n",
    "  mkenv            Create an environment bound to an installed version.\n",
    "  rmenv            Delete an environment.\n",
    "  lsenvs           List environments under GOVE_HOME.\n",
    "  migrate          Point an environment at another installed version.\n",
    "  export / import  Write an environment manifest or rebuild one from it.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = GOVE_BEFORE_HELP,
    help_template = GOVE_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct GoveCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging and stream build output (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Fetch, verify, and build a Go version into the cache.",
        override_usage = "gove install <VERSION> [--mode git|source|binary] [--force]",
        after_help = "Examples:\n  gove install 1.3.2\n  gove install 1.3.2 --mode binary\n  gove install tip --force\n"
    )]
    Install(InstallArgs),
    #[command(
        about = "Remove a cached Go version.",
        after_help = "Example:\n  gove uninstall 1.3.2\n"
    )]
    Uninstall(UninstallArgs),
    #[command(
        about = "Show installed versions and the ones that can be installed.",
        after_help = "Examples:\n  gove list\n  gove list --installed\n  gove --json list --available\n"
    )]
    List(ListArgs),
    #[command(
        about = "Create an environment bound to an installed Go version.",
        override_usage = "gove mkenv <NAME> <VERSION> [--prompt PROMPT] [--force]",
        after_help = "Examples:\n  gove mkenv dev 1.3.2\n  gove mkenv dev go1.3.2 --prompt '[dev]'\n"
    )]
    Mkenv(MkenvArgs),
    #[command(
        about = "Delete an environment.",
        after_help = "Example:\n  gove rmenv dev\n"
    )]
    Rmenv(RmenvArgs),
    #[command(
        about = "List environments under GOVE_HOME.",
        after_help = "Example:\n  gove lsenvs\n"
    )]
    Lsenvs,
    #[command(
        about = "Point an environment at another installed Go version.",
        after_help = "Example:\n  gove migrate dev 1.3.3\n"
    )]
    Migrate(MigrateArgs),
    #[command(
        about = "Write the environment manifest (toolchain and package revisions).",
        override_usage = "gove export [ENV] [--name FILE] [--prettify] [--force]",
        after_help = "Examples:\n  gove export\n  gove export dev --name dev.manifest --prettify\n"
    )]
    Export(ExportArgs),
    #[command(
        about = "Rebuild an environment from a manifest.",
        override_usage = "gove import <FILE> [--prompt PROMPT] [--force]",
        after_help = "Examples:\n  gove import gove.manifest\n  gove import dev.manifest --force\n"
    )]
    Import(ImportArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModeArg {
    Git,
    Source,
    Binary,
}

impl From<ModeArg> for InstallMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Git => InstallMode::Git,
            ModeArg::Source => InstallMode::Source,
            ModeArg::Binary => InstallMode::Binary,
        }
    }
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,
    #[arg(
        long,
        value_enum,
        default_value_t = ModeArg::Git,
        help = "Where to fetch the toolchain from"
    )]
    pub mode: ModeArg,
    #[arg(long, help = "Reinstall even when the version is already present")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "available", help = "Only list installed versions")]
    pub installed: bool,
    #[arg(long, help = "Only list versions that are not installed")]
    pub available: bool,
}

#[derive(Args, Debug)]
pub struct MkenvArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "VERSION")]
    pub version: String,
    #[arg(long, help = "Shell prompt prefix (defaults to \"(NAME)\")")]
    pub prompt: Option<String>,
    #[arg(long, help = "Replace an existing environment")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RmenvArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(value_name = "ENV", help = "Environment to export (defaults to GOVE_ENV)")]
    pub environment: Option<String>,
    #[arg(long, value_name = "FILE", help = "Manifest file name inside the environment")]
    pub name: Option<String>,
    #[arg(long, help = "Indent the manifest")]
    pub prettify: bool,
    #[arg(long, help = "Overwrite an existing manifest")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(value_name = "FILE", value_parser = value_parser!(PathBuf))]
    pub manifest: PathBuf,
    #[arg(long, help = "Shell prompt prefix for the rebuilt environment")]
    pub prompt: Option<String>,
    #[arg(long, help = "Replace an existing environment with the same name")]
    pub force: bool,
}
