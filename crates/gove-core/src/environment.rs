//! Environments: a directory under the tool home bound to one cached
//! toolchain through the `lib` symlink.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use gove_domain::host_platform;
use serde::Serialize;
use tracing::{debug, info};

use crate::effects::{OutputSink, ProcessRunner};
use crate::errors::GoveError;
use crate::fs::{remove_dir_all_writable, replace_dir_link};
use crate::toolchain::ToolchainCache;

/// Name under the tool home that holds templates, never an environment.
const SCRIPTS_DIR: &str = "scripts";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("activate", include_str!("../templates/activate")),
    ("activate.fish", include_str!("../templates/activate.fish")),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    name: String,
    root: PathBuf,
    toolchain_root: PathBuf,
    tool_dir: PathBuf,
    workspace: PathBuf,
    prompt: String,
}

impl Environment {
    /// Computes the layout for `name` under `home`. Nothing is touched on disk.
    #[must_use]
    pub fn create(home: &Path, name: &str, prompt: Option<&str>) -> Self {
        let root = home.join(name);
        let toolchain_root = root.join("lib");
        let tool_dir = toolchain_root.join("pkg").join("tool").join(host_tool_dir());
        let prompt = match prompt {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ => format!("({name})"),
        };
        Self {
            name: name.to_string(),
            workspace: root.join("src"),
            root,
            toolchain_root,
            tool_dir,
            prompt,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn toolchain_root(&self) -> &Path {
        &self.toolchain_root
    }

    #[must_use]
    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// An environment is usable once its activation script exists.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bin_dir().join("activate").is_file()
    }

    /// Writes the activation scripts, preferring templates found in
    /// `template_dir` over the built-in ones. Safe to re-run.
    ///
    /// # Errors
    /// Returns an error if a directory or script cannot be written.
    pub fn generate(&self, template_dir: &Path) -> Result<Vec<PathBuf>> {
        let bin = self.bin_dir();
        for dir in [&bin, &self.workspace] {
            fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let mut written = Vec::with_capacity(BUILTIN_TEMPLATES.len());
        for (file, builtin) in BUILTIN_TEMPLATES {
            let custom = template_dir.join(file);
            let template = match fs::read_to_string(&custom) {
                Ok(contents) => {
                    debug!(template = %custom.display(), "using custom activation template");
                    contents
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => (*builtin).to_string(),
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to read {}", custom.display()))
                }
            };
            let target = bin.join(file);
            fs::write(&target, self.render(&template))
                .with_context(|| format!("failed to write {}", target.display()))?;
            written.push(target);
        }
        Ok(written)
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("{{ToolchainRoot}}", &self.toolchain_root.display().to_string())
            .replace("{{ToolDir}}", &self.tool_dir.display().to_string())
            .replace("{{Workspace}}", &self.workspace.display().to_string())
            .replace("{{PromptPrefix}}", &self.prompt)
            .replace("{{EnvironmentRoot}}", &self.root.display().to_string())
    }

    /// Makes sure `version` is ready in the cache, then points the toolchain
    /// link at it.
    ///
    /// # Errors
    /// Propagates cache failures and link replacement errors.
    pub fn install(
        &self,
        cache: &ToolchainCache,
        version: &str,
        runner: &dyn ProcessRunner,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<PathBuf> {
        let target = cache.ensure_ready(version, runner, sink)?;
        replace_dir_link(&target, &self.toolchain_root)?;
        info!(environment = %self.name, %version, "toolchain linked");
        Ok(target)
    }

    /// Relinks the environment to an already installed `version`. Returns
    /// `false` when it already used that version.
    ///
    /// # Errors
    /// Returns [`GoveError::EnvironmentMissing`] or
    /// [`GoveError::NotInstalled`] when either side is absent.
    pub fn migrate(&self, cache: &ToolchainCache, version: &str) -> Result<bool> {
        if !self.exists() {
            return Err(GoveError::EnvironmentMissing {
                name: self.name.clone(),
            }
            .into());
        }
        if !cache.freshness_check(version)? {
            return Err(GoveError::NotInstalled {
                version: version.to_string(),
            }
            .into());
        }
        if self.toolchain_version().ok().as_deref() == Some(version) {
            debug!(environment = %self.name, %version, "already linked");
            return Ok(false);
        }
        replace_dir_link(&cache.content_path(version), &self.toolchain_root)?;
        info!(environment = %self.name, %version, "environment migrated");
        Ok(true)
    }

    /// Name of the cached version the toolchain link points at.
    ///
    /// # Errors
    /// Returns [`GoveError::MissingToolchainLink`] when the link is absent or
    /// unreadable.
    pub fn toolchain_version(&self) -> Result<String> {
        let missing = || GoveError::MissingToolchainLink {
            name: self.name.clone(),
        };
        let target = fs::read_link(&self.toolchain_root).map_err(|_| missing())?;
        target
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToString::to_string)
            .ok_or_else(|| missing().into())
    }

    /// # Errors
    /// Returns an error if the tree cannot be removed.
    pub fn remove(&self) -> Result<()> {
        remove_dir_all_writable(&self.root)
    }

    /// Variables a build inside this environment runs with; `base_path` is
    /// the `PATH` to extend, usually the caller's own.
    ///
    /// # Errors
    /// Returns an error if a path contains the platform's separator.
    pub fn exec_context(&self, base_path: Option<OsString>) -> Result<ExecContext> {
        let mut entries = vec![self.toolchain_root.join("bin"), self.bin_dir()];
        if let Some(base) = base_path {
            entries.extend(env::split_paths(&base));
        }
        let path = env::join_paths(entries).context("failed to assemble PATH")?;
        let display = |path: &Path| path.display().to_string();
        Ok(ExecContext {
            vars: vec![
                ("GOROOT".to_string(), display(&self.toolchain_root)),
                ("GOTOOLDIR".to_string(), display(&self.tool_dir)),
                ("GOPATH".to_string(), display(&self.root)),
                ("GOVE_ENV".to_string(), display(&self.root)),
                ("PATH".to_string(), path.to_string_lossy().into_owned()),
            ],
        })
    }
}

/// Environment variables for commands spawned inside an environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecContext {
    vars: Vec<(String, String)>,
}

impl ExecContext {
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.vars
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct EnvironmentListing {
    pub available: Vec<String>,
    pub invalid: Vec<String>,
}

/// Splits the directories under `home` into usable and broken environments.
///
/// # Errors
/// Returns an error if `home` exists but cannot be listed.
pub fn list_environments(home: &Path) -> Result<EnvironmentListing> {
    let entries = match fs::read_dir(home) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(EnvironmentListing::default())
        }
        Err(err) => return Err(err).with_context(|| format!("failed to list {}", home.display())),
    };
    let mut listing = EnvironmentListing::default();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", home.display()))?;
        if !entry.file_type().is_ok_and(|kind| kind.is_dir()) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
            continue;
        };
        if name == SCRIPTS_DIR || name.starts_with('.') {
            continue;
        }
        if Environment::create(home, &name, None).is_valid() {
            listing.available.push(name);
        } else {
            listing.invalid.push(name);
        }
    }
    listing.available.sort();
    listing.invalid.sort();
    Ok(listing)
}

/// Where custom activation templates are looked up.
#[must_use]
pub fn template_dir(home: &Path) -> PathBuf {
    home.join(SCRIPTS_DIR).join("tpl")
}

fn host_tool_dir() -> String {
    host_platform().map_or_else(
        || format!("{}_{}", env::consts::OS, env::consts::ARCH),
        |platform| platform.tool_dir(),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{BuildConfig, NetworkConfig};
    use crate::test_support::FakeRunner;
    use crate::toolchain::integrity;
    use gove_domain::FingerprintTable;
    use tempfile::tempdir;

    pub(crate) fn test_cache(root: &Path) -> ToolchainCache {
        ToolchainCache::new(
            root.to_path_buf(),
            FingerprintTable::builtin(),
            NetworkConfig {
                download_url: "http://127.0.0.1:9".into(),
                legacy_download_url: "http://127.0.0.1:9".into(),
                git_repo: "http://127.0.0.1:9/go.git".into(),
                keep_proxies: false,
            },
            BuildConfig {
                no_cgo: false,
                bootstrap: None,
            },
            host_platform(),
        )
    }

    /// Lays out a verified toolchain directory without downloading anything.
    pub(crate) fn seed_version(cache: &ToolchainCache, name: &str) -> PathBuf {
        let root = cache.content_path(name);
        fs::create_dir_all(root.join("bin")).expect("bin");
        fs::write(root.join("bin/go"), format!("#!/bin/sh\necho {name}\n")).expect("go");
        fs::write(root.join("VERSION"), name).expect("version");
        integrity::generate_manifest(&root).expect("manifest");
        root
    }

    #[test]
    fn create_only_computes_paths() {
        let temp = tempdir().expect("tempdir");
        let env = Environment::create(temp.path(), "dev", None);
        assert!(!env.exists());
        assert_eq!(env.prompt(), "(dev)");
        assert_eq!(env.toolchain_root(), temp.path().join("dev/lib"));
        assert_eq!(env.workspace(), temp.path().join("dev/src"));
        assert!(env.tool_dir().starts_with(temp.path().join("dev/lib/pkg/tool")));
        assert!(!temp.path().join("dev").exists());
    }

    #[test]
    fn generate_renders_every_placeholder_and_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let env = Environment::create(temp.path(), "dev", Some("[dev]"));
        let tpl = template_dir(temp.path());
        let written = env.generate(&tpl).expect("generate");
        assert_eq!(written.len(), 2);
        let first = fs::read_to_string(env.bin_dir().join("activate")).expect("read");
        assert!(!first.contains("{{"));
        assert!(first.contains(&env.toolchain_root().display().to_string()));
        assert!(first.contains("[dev]"));
        assert!(first.contains("_GOVE_PREV_"));
        assert!(env.is_valid());

        env.generate(&tpl).expect("again");
        let second = fs::read_to_string(env.bin_dir().join("activate")).expect("read");
        assert_eq!(first, second);
    }

    #[test]
    fn custom_templates_override_builtins() {
        let temp = tempdir().expect("tempdir");
        let tpl = template_dir(temp.path());
        fs::create_dir_all(&tpl).expect("tpl");
        fs::write(tpl.join("activate"), "export GOROOT={{ToolchainRoot}}\n").expect("tpl");
        let env = Environment::create(temp.path(), "dev", None);
        env.generate(&tpl).expect("generate");
        let rendered = fs::read_to_string(env.bin_dir().join("activate")).expect("read");
        assert_eq!(
            rendered,
            format!("export GOROOT={}\n", env.toolchain_root().display())
        );
        let fish = fs::read_to_string(env.bin_dir().join("activate.fish")).expect("fish");
        assert!(fish.contains("set -gx GOROOT"));
    }

    #[cfg(unix)]
    #[test]
    fn install_links_and_migrate_relinks() {
        let temp = tempdir().expect("tempdir");
        let cache = test_cache(&temp.path().join("cache"));
        let v132 = seed_version(&cache, "1.3.2");
        let v133 = seed_version(&cache, "1.3.3");
        let env = Environment::create(&temp.path().join("home"), "dev", None);
        env.generate(&temp.path().join("none")).expect("generate");

        let runner = FakeRunner::default();
        env.install(&cache, "1.3.2", &runner, None).expect("install");
        assert!(runner.calls().is_empty());
        assert_eq!(fs::read_link(env.toolchain_root()).expect("link"), v132);
        assert_eq!(env.toolchain_version().expect("version"), "1.3.2");

        assert!(!env.migrate(&cache, "1.3.2").expect("noop"));
        assert!(env.migrate(&cache, "1.3.3").expect("migrate"));
        assert_eq!(fs::read_link(env.toolchain_root()).expect("link"), v133);

        let err = env.migrate(&cache, "1.2.2").expect_err("missing");
        assert!(crate::errors::is_not_installed(&err));
    }

    #[test]
    fn missing_link_is_reported_explicitly() {
        let temp = tempdir().expect("tempdir");
        let env = Environment::create(temp.path(), "bare", None);
        env.generate(&temp.path().join("none")).expect("generate");
        let err = env.toolchain_version().expect_err("no link");
        assert!(matches!(
            err.downcast_ref::<GoveError>(),
            Some(GoveError::MissingToolchainLink { .. })
        ));
    }

    #[test]
    fn exec_context_prefixes_path() {
        let temp = tempdir().expect("tempdir");
        let env = Environment::create(temp.path(), "dev", None);
        let ctx = env
            .exec_context(Some(OsString::from("/usr/bin")))
            .expect("context");
        let root = temp.path().join("dev");
        assert_eq!(ctx.get("GOPATH"), Some(root.display().to_string().as_str()));
        assert_eq!(ctx.get("GOVE_ENV"), ctx.get("GOPATH"));
        let path = ctx.get("PATH").expect("PATH");
        let parts: Vec<PathBuf> = env::split_paths(path).collect();
        assert_eq!(parts[0], root.join("lib/bin"));
        assert_eq!(parts[1], root.join("bin"));
        assert_eq!(parts[2], PathBuf::from("/usr/bin"));
    }

    #[test]
    fn listing_separates_broken_environments() {
        let temp = tempdir().expect("tempdir");
        let tpl = template_dir(temp.path());
        Environment::create(temp.path(), "good", None)
            .generate(&tpl)
            .expect("good");
        fs::create_dir_all(temp.path().join("broken/src")).expect("broken");
        fs::create_dir_all(&tpl).expect("scripts");

        let listing = list_environments(temp.path()).expect("list");
        assert_eq!(listing.available, ["good"]);
        assert_eq!(listing.invalid, ["broken"]);
        assert_eq!(
            list_environments(&temp.path().join("absent")).expect("empty"),
            EnvironmentListing::default()
        );
    }
}
