use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_DOWNLOAD_URL: &str = "https://storage.googleapis.com/golang";
const DEFAULT_LEGACY_DOWNLOAD_URL: &str = "https://go.googlecode.com/files";
const DEFAULT_GIT_REPO: &str = "https://github.com/golang/go.git";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

impl GlobalOptions {
    /// Whether subprocess output should be streamed as it arrives.
    #[must_use]
    pub fn streams_output(&self) -> bool {
        self.verbose > 0 && !self.quiet && !self.json
    }
}

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(
            self.var(key).map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[must_use]
    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) paths: PathsConfig,
    pub(crate) build: BuildConfig,
    pub(crate) network: NetworkConfig,
    pub(crate) active_env: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Toolchain cache root.
    pub cache: PathBuf,
    /// Tool home: environments and activation templates.
    pub home: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub no_cgo: bool,
    pub bootstrap: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub download_url: String,
    pub legacy_download_url: String,
    pub git_repo: String,
    pub keep_proxies: bool,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if the cache or home directory cannot be resolved.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    /// # Errors
    /// Returns an error if the cache or home directory cannot be resolved.
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let cache = match snapshot.var("GOVE_CACHE_HOME") {
            Some(path) => PathBuf::from(path),
            None => dirs_next::cache_dir()
                .map(|dir| dir.join("gove"))
                .ok_or_else(|| anyhow!("unable to determine a cache directory; set GOVE_CACHE_HOME"))?,
        };
        let home = match snapshot.var("GOVE_HOME") {
            Some(path) => PathBuf::from(path),
            None => dirs_next::home_dir()
                .map(|dir| dir.join(".gove"))
                .ok_or_else(|| anyhow!("unable to determine the home directory; set GOVE_HOME"))?,
        };
        let cache = std::path::absolute(&cache)
            .with_context(|| format!("invalid cache directory {}", cache.display()))?;
        let home = std::path::absolute(&home)
            .with_context(|| format!("invalid home directory {}", home.display()))?;
        Ok(Self {
            paths: PathsConfig { cache, home },
            build: BuildConfig {
                no_cgo: snapshot.flag_is_enabled("GOVE_NO_CGO"),
                bootstrap: snapshot.var("GOROOT_BOOTSTRAP").map(PathBuf::from),
            },
            network: NetworkConfig {
                download_url: snapshot
                    .var("GOVE_DOWNLOAD_URL")
                    .unwrap_or(DEFAULT_DOWNLOAD_URL)
                    .to_string(),
                legacy_download_url: snapshot
                    .var("GOVE_LEGACY_DOWNLOAD_URL")
                    .unwrap_or(DEFAULT_LEGACY_DOWNLOAD_URL)
                    .to_string(),
                git_repo: snapshot
                    .var("GOVE_GIT_REPO")
                    .unwrap_or(DEFAULT_GIT_REPO)
                    .to_string(),
                keep_proxies: snapshot.flag_is_enabled("GOVE_KEEP_PROXIES"),
            },
            active_env: snapshot.var("GOVE_ENV").map(PathBuf::from),
        })
    }

    #[must_use]
    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    #[must_use]
    pub fn build(&self) -> &BuildConfig {
        &self.build
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    #[must_use]
    pub fn active_env(&self) -> Option<&PathBuf> {
        self.active_env.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn overrides_come_from_the_snapshot() {
        let snapshot = EnvSnapshot::testing(&[
            ("GOVE_CACHE_HOME", "/tmp/cache"),
            ("GOVE_HOME", "/tmp/home"),
            ("GOVE_ENV", "/tmp/home/dev"),
            ("GOVE_NO_CGO", "1"),
            ("GOROOT_BOOTSTRAP", "/opt/go1.4"),
            ("GOVE_DOWNLOAD_URL", "http://127.0.0.1:9/golang"),
        ]);
        let config = Config::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.paths().cache, PathBuf::from("/tmp/cache"));
        assert_eq!(config.paths().home, PathBuf::from("/tmp/home"));
        assert_eq!(config.active_env(), Some(&PathBuf::from("/tmp/home/dev")));
        assert!(config.build().no_cgo);
        assert_eq!(config.build().bootstrap, Some(PathBuf::from("/opt/go1.4")));
        assert_eq!(config.network().download_url, "http://127.0.0.1:9/golang");
        assert_eq!(config.network().git_repo, DEFAULT_GIT_REPO);
    }

    #[test]
    #[serial]
    fn process_environment_is_captured() {
        let previous = env::var_os("GOVE_HOME");
        env::set_var("GOVE_HOME", "/tmp/gove-home-from-env");
        let config = Config::from_env().expect("config");
        match previous {
            Some(value) => env::set_var("GOVE_HOME", value),
            None => env::remove_var("GOVE_HOME"),
        }
        assert_eq!(config.paths().home, PathBuf::from("/tmp/gove-home-from-env"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let snapshot = EnvSnapshot::testing(&[
            ("GOVE_CACHE_HOME", "/c"),
            ("GOVE_HOME", "/h"),
            ("GOVE_ENV", ""),
            ("GOVE_NO_CGO", "0"),
        ]);
        let config = Config::from_snapshot(&snapshot).expect("config");
        assert!(config.active_env().is_none());
        assert!(!config.build().no_cgo);
        assert_eq!(config.network().download_url, DEFAULT_DOWNLOAD_URL);
    }
}
