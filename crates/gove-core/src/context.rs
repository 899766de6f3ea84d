use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{Config, EnvSnapshot, GlobalOptions};
use crate::effects::{Effects, OutputSink, SharedEffects};
use crate::environment::Environment;
use crate::toolchain::ToolchainCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Install,
    Uninstall,
    List,
    Mkenv,
    Rmenv,
    Lsenvs,
    Migrate,
    Export,
    Import,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Install => "install",
            CommandGroup::Uninstall => "uninstall",
            CommandGroup::List => "list",
            CommandGroup::Mkenv => "mkenv",
            CommandGroup::Rmenv => "rmenv",
            CommandGroup::Lsenvs => "lsenvs",
            CommandGroup::Migrate => "migrate",
            CommandGroup::Export => "export",
            CommandGroup::Import => "import",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    env: EnvSnapshot,
    config: Config,
    cache: ToolchainCache,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context from the current process environment.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be resolved.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        Self::with_snapshot(global, EnvSnapshot::capture(), effects)
    }

    /// # Errors
    /// Returns an error if the configuration cannot be resolved.
    pub fn with_snapshot(
        global: &'a GlobalOptions,
        env: EnvSnapshot,
        effects: SharedEffects,
    ) -> Result<Self> {
        let config = Config::from_snapshot(&env)?;
        let cache = ToolchainCache::from_config(&config);
        Ok(Self {
            global,
            env,
            config,
            cache,
            effects,
        })
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ToolchainCache {
        &self.cache
    }

    pub fn home(&self) -> &Path {
        &self.config.paths().home
    }

    /// Output sink for subprocesses, present only in verbose mode.
    pub fn sink(&self) -> Option<Arc<dyn OutputSink>> {
        self.global
            .streams_output()
            .then(|| self.effects.sink())
    }

    pub fn environment(&self, name: &str, prompt: Option<&str>) -> Environment {
        Environment::create(self.home(), name, prompt)
    }

    /// Name of the environment named by `GOVE_ENV`, if any.
    pub fn active_environment(&self) -> Option<String> {
        self.config
            .active_env()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .map(ToString::to_string)
    }

    /// `PATH` of the invoking shell, extended by package builds.
    pub fn base_path(&self) -> Option<OsString> {
        self.env.var("PATH").map(OsString::from)
    }
}
