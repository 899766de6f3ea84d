use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::checksums::FingerprintTable;

/// How a toolchain version reaches the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstallMode {
    #[default]
    Git,
    Source,
    Binary,
}

impl InstallMode {
    /// Picks the mode that produced a cache directory called `name`.
    #[must_use]
    pub fn infer(name: &str, table: &FingerprintTable) -> Self {
        if table.is_binary(name) {
            InstallMode::Binary
        } else if table.is_source(name) {
            InstallMode::Source
        } else {
            InstallMode::Git
        }
    }

    #[must_use]
    pub const fn needs_compile(self) -> bool {
        !matches!(self, InstallMode::Binary)
    }
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallMode::Git => "git",
            InstallMode::Source => "source",
            InstallMode::Binary => "binary",
        })
    }
}

/// Maps what a user types to the upstream tag name.
#[must_use]
pub fn normalize_tag(version: &str) -> String {
    let version = version.trim();
    if matches!(version, "go" | "tip")
        || version.starts_with("go")
        || version.starts_with("release.")
        || version.starts_with("weekly.")
    {
        return version.to_string();
    }
    if version.starts_with('1') {
        return format!("go{version}");
    }
    if version.starts_with('5') || version.starts_with('6') {
        return format!("release.r{version}");
    }
    version.to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl HostPlatform {
    /// Tool directory component, e.g. `linux_amd64`.
    #[must_use]
    pub fn tool_dir(&self) -> String {
        format!("{}_{}", self.os, self.arch)
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

/// Host platform in upstream naming, or `None` when releases are not built for it.
#[must_use]
pub fn host_platform() -> Option<HostPlatform> {
    let os = match std::env::consts::OS {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        "freebsd" => "freebsd",
        _ => return None,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "arm",
        _ => return None,
    };
    Some(HostPlatform { os, arch })
}

#[must_use]
pub fn binary_version_name(version: &str, platform: &HostPlatform) -> String {
    if platform.os == "darwin" {
        format!("{version}.darwin-{}-osx10.8", platform.arch)
    } else {
        format!("{version}.{}-{}", platform.os, platform.arch)
    }
}

/// Archive file name for a source version or binary version name.
#[must_use]
pub fn archive_name(name: &str, mode: InstallMode, platform: &HostPlatform) -> String {
    match mode {
        InstallMode::Binary if platform.is_windows() => format!("go{name}.zip"),
        InstallMode::Binary => format!("go{name}.tar.gz"),
        InstallMode::Source | InstallMode::Git => format!("go{name}.src.tar.gz"),
    }
}

/// Download URL for `archive`. Releases before 1.2.2 live on the legacy origin.
#[must_use]
pub fn release_url(origin: &str, legacy_origin: &str, numeric: &str, archive: &str) -> String {
    let cutoff = ReleaseVersion {
        parts: vec![1, 2, 2],
    };
    let base = match ReleaseVersion::from_str(numeric) {
        Ok(version) if version < cutoff => legacy_origin,
        _ => origin,
    };
    format!("{}/{archive}", base.trim_end_matches('/'))
}

/// Numeric prefix of a release string; `1.4beta1` compares as `1.4`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseVersion {
    parts: Vec<u64>,
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for segment in value.trim().trim_start_matches("go").split('.') {
            let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse()?);
            if digits.len() != segment.len() {
                break;
            }
        }
        if parts.is_empty() {
            anyhow::bail!("`{value}` is not a numeric release");
        }
        Ok(Self { parts })
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|idx| {
                let left = self.parts.get(idx).copied().unwrap_or(0);
                let right = other.parts.get(idx).copied().unwrap_or(0);
                left.cmp(&right)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
