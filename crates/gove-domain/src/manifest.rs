use std::collections::HashSet;

use camino::{Utf8Component, Utf8Path};
use serde::{Deserialize, Serialize};

use crate::vcs::VcsKind;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid environment manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("environment manifest has no environment name")]
    MissingName,
    #[error("`{0}` is not a valid environment name")]
    InvalidName(String),
    #[error("environment manifest does not record a toolchain version")]
    MissingToolchain,
    #[error("`{0}` is not a valid toolchain version")]
    InvalidToolchain(String),
    #[error("package `{0}` is listed more than once")]
    DuplicatePackage(String),
    #[error("package path `{0}` must be relative to the workspace")]
    InvalidPackagePath(String),
}

/// Cache entries that are never toolchain versions.
pub const RESERVED_CACHE_NAMES: &[&str] = &["git", "logs"];

/// Entries of the tool home that are never environments.
pub const RESERVED_HOME_NAMES: &[&str] = &["scripts"];

/// True when `name` is exactly one visible path component.
#[must_use]
pub fn is_plain_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Utf8Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Utf8Component::Normal(_)), None)
    )
}

#[must_use]
pub fn is_environment_name(name: &str) -> bool {
    is_plain_name(name) && !RESERVED_HOME_NAMES.contains(&name)
}

#[must_use]
pub fn is_toolchain_name(name: &str) -> bool {
    is_plain_name(name) && !RESERVED_CACHE_NAMES.contains(&name)
}

/// Portable snapshot of one environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentManifest {
    #[serde(rename = "environment_name")]
    pub name: String,
    #[serde(rename = "environment_path", default)]
    pub path: String,
    #[serde(rename = "environment_toolchain_version")]
    pub toolchain_version: String,
    #[serde(rename = "environment_packages", default)]
    pub packages: Vec<PackageManifest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(rename = "package_name")]
    pub name: String,
    /// Import path relative to the workspace source root.
    #[serde(rename = "package_url")]
    pub url: String,
    #[serde(rename = "package_vcs")]
    pub vcs: VcsKind,
    #[serde(rename = "package_vcs_revision", default)]
    pub revision: String,
}

impl PackageManifest {
    #[must_use]
    pub fn new(url: &str, vcs: VcsKind, revision: impl Into<String>) -> Self {
        let name = Utf8Path::new(url).file_name().unwrap_or(url).to_string();
        Self {
            name,
            url: url.to_string(),
            vcs,
            revision: revision.into(),
        }
    }
}

impl EnvironmentManifest {
    /// Builds a manifest and checks its invariants.
    ///
    /// # Errors
    /// Returns [`ManifestError`] when a package path repeats or escapes the
    /// workspace, or when the name or toolchain version is blank.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        toolchain_version: impl Into<String>,
        packages: Vec<PackageManifest>,
    ) -> Result<Self, ManifestError> {
        let manifest = Self {
            name: name.into(),
            path: path.into(),
            toolchain_version: toolchain_version.into(),
            packages,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parses and validates a serialized manifest.
    ///
    /// # Errors
    /// Returns [`ManifestError`] on malformed JSON or broken invariants.
    pub fn from_json(contents: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn render(&self, pretty: bool) -> Result<String, ManifestError> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(rendered)
    }

    /// # Errors
    /// Returns the first invariant the manifest breaks.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::MissingName);
        }
        if !is_environment_name(&self.name) {
            return Err(ManifestError::InvalidName(self.name.clone()));
        }
        if self.toolchain_version.trim().is_empty() {
            return Err(ManifestError::MissingToolchain);
        }
        if !is_toolchain_name(&self.toolchain_version) {
            return Err(ManifestError::InvalidToolchain(
                self.toolchain_version.clone(),
            ));
        }
        let mut seen = HashSet::new();
        for package in &self.packages {
            let path = Utf8Path::new(&package.url);
            let escapes = package.url.is_empty()
                || path
                    .components()
                    .any(|component| !matches!(component, Utf8Component::Normal(_)));
            if escapes {
                return Err(ManifestError::InvalidPackagePath(package.url.clone()));
            }
            if !seen.insert(package.url.as_str()) {
                return Err(ManifestError::DuplicatePackage(package.url.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"environment_name":"sample","environment_toolchain_version":"1.3.2","environment_packages":[{"package_name":"test","package_url":"test.example/test","package_vcs":"hg","package_vcs_revision":"0000000000000000000000000000000000000000"}]}"#;

    #[test]
    fn parses_manifest_without_path() {
        let manifest = EnvironmentManifest::from_json(SAMPLE).expect("manifest");
        assert_eq!(manifest.name, "sample");
        assert_eq!(manifest.path, "");
        assert_eq!(manifest.toolchain_version, "1.3.2");
        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(manifest.packages[0].vcs, VcsKind::Hg);
        assert_eq!(manifest.packages[0].url, "test.example/test");
    }

    #[test]
    fn rendering_uses_the_wire_field_names() {
        let manifest = EnvironmentManifest::new(
            "demo",
            "/home/me/.gove/demo",
            "go1.3.2",
            vec![PackageManifest::new("github.com/user/lib", VcsKind::Git, "abc123")],
        )
        .expect("manifest");
        let rendered = manifest.render(false).expect("render");
        assert!(rendered.starts_with(r#"{"environment_name":"demo","environment_path""#));
        assert!(rendered.contains(r#""package_name":"lib""#));
        assert!(rendered.contains(r#""package_vcs":"git""#));
        assert_eq!(rendered, manifest.render(false).expect("render again"));
        assert!(manifest.render(true).expect("pretty").contains("\n  "));
    }

    #[test]
    fn duplicate_import_paths_are_rejected() {
        let package = PackageManifest::new("example.org/a", VcsKind::Git, "1");
        let err = EnvironmentManifest::new("demo", "", "1.3", vec![package.clone(), package])
            .expect_err("duplicate");
        assert!(matches!(err, ManifestError::DuplicatePackage(url) if url == "example.org/a"));
    }

    #[test]
    fn package_paths_must_stay_inside_the_workspace() {
        for bad in ["../outside", "/abs/path", ""] {
            let package = PackageManifest::new(bad, VcsKind::Svn, "7");
            let err = EnvironmentManifest::new("demo", "", "1.3", vec![package])
                .expect_err("escaping path");
            assert!(matches!(err, ManifestError::InvalidPackagePath(_)), "{bad}");
        }
    }

    #[test]
    fn names_must_be_single_components() {
        for good in ["dev", "go1.3.2", "1.3.2.linux-amd64", "release.r60"] {
            assert!(is_plain_name(good), "{good}");
        }
        for bad in ["", ".", "..", "../victim", "a/b", "/", "a\\b", ".hidden"] {
            assert!(!is_plain_name(bad), "{bad}");
        }
        assert!(!is_environment_name("scripts"));
        assert!(!is_toolchain_name("git"));
        assert!(!is_toolchain_name("logs"));
    }

    #[test]
    fn escaping_manifest_names_are_rejected() {
        let raw = r#"{"environment_name":"x","environment_toolchain_version":"../victim"}"#;
        assert!(matches!(
            EnvironmentManifest::from_json(raw),
            Err(ManifestError::InvalidToolchain(version)) if version == "../victim"
        ));
        for name in ["../victim2", "..", "/", "scripts"] {
            let err = EnvironmentManifest::new(name, "", "1.3.2", Vec::new()).expect_err("name");
            assert!(matches!(err, ManifestError::InvalidName(_)), "{name}");
        }
    }

    #[test]
    fn blank_toolchain_is_rejected() {
        let raw = r#"{"environment_name":"x","environment_toolchain_version":" "}"#;
        assert!(matches!(
            EnvironmentManifest::from_json(raw),
            Err(ManifestError::MissingToolchain)
        ));
    }
}
