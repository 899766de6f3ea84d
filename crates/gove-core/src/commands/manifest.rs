use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use gove_domain::{is_plain_name, EnvironmentManifest};
use serde_json::json;

use super::{check_environment_name, ensure_inactive, recover};
use crate::context::CommandContext;
use crate::env_manifest::{self, ReplayOptions};
use crate::errors::GoveError;
use crate::outcome::ExecutionOutcome;

/// File written inside the environment when no name is given.
pub const DEFAULT_MANIFEST_NAME: &str = "gove.manifest";

#[derive(Clone, Debug, Default)]
pub struct ExportRequest {
    /// Environment to export; defaults to the active one.
    pub environment: Option<String>,
    pub name: Option<String>,
    pub prettify: bool,
    pub force: bool,
}

#[derive(Clone, Debug)]
pub struct ImportRequest {
    pub manifest: PathBuf,
    pub prompt: Option<String>,
    pub force: bool,
}

/// Writes the manifest of an environment next to its workspace.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn export(ctx: &CommandContext, request: &ExportRequest) -> Result<ExecutionOutcome> {
    recover(export_outcome(ctx, request))
}

fn export_outcome(ctx: &CommandContext, request: &ExportRequest) -> Result<ExecutionOutcome> {
    let Some(name) = request
        .environment
        .clone()
        .or_else(|| ctx.active_environment())
    else {
        return Ok(ExecutionOutcome::user_error(
            "no environment given and none is active",
            json!({ "hint": "pass an environment name or activate one first" }),
        ));
    };
    check_environment_name(&name)?;
    let env = ctx.environment(&name, None);
    if !env.exists() {
        return Err(GoveError::EnvironmentMissing { name }.into());
    }

    let file_name = request.name.as_deref().unwrap_or(DEFAULT_MANIFEST_NAME);
    if !is_plain_name(file_name) {
        return Err(GoveError::InvalidManifestName {
            name: file_name.to_string(),
        }
        .into());
    }
    let path = env.root().join(file_name);
    if path.exists() && !request.force {
        return Err(GoveError::ManifestExists { path }.into());
    }

    let manifest = env_manifest::export(&env, ctx.effects())?;
    let mut rendered = manifest.render(request.prettify)?;
    rendered.push('\n');
    fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(ExecutionOutcome::success(
        format!("exported {name} to {}", path.display()),
        json!({
            "environment": name,
            "path": path.display().to_string(),
            "version": manifest.toolchain_version,
            "packages": manifest.packages.len(),
        }),
    ))
}

/// Rebuilds an environment from a manifest file.
///
/// # Errors
/// Returns an error for unexpected I/O failures.
pub fn import(ctx: &CommandContext, request: &ImportRequest) -> Result<ExecutionOutcome> {
    recover(import_outcome(ctx, request))
}

fn import_outcome(ctx: &CommandContext, request: &ImportRequest) -> Result<ExecutionOutcome> {
    let path = &request.manifest;
    if !path.is_file() {
        return Ok(ExecutionOutcome::user_error(
            format!("manifest {} not found", path.display()),
            json!({ "path": path.display().to_string() }),
        ));
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let manifest = match EnvironmentManifest::from_json(&contents) {
        Ok(manifest) => manifest,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                err.to_string(),
                json!({ "path": path.display().to_string() }),
            ))
        }
    };

    ensure_inactive(ctx, &manifest.name)?;
    let options = ReplayOptions {
        prompt: request.prompt.clone(),
        force: request.force,
        verbose: ctx.global.streams_output(),
        base_path: ctx.base_path(),
    };
    let report = env_manifest::replay(
        &manifest,
        ctx.home(),
        &options,
        ctx.cache(),
        ctx.effects(),
    )?;
    Ok(ExecutionOutcome::success(
        format!(
            "imported {} ({} packages, toolchain {})",
            manifest.name, report.packages, manifest.toolchain_version
        ),
        json!({
            "environment": manifest.name,
            "path": report.environment.root().display().to_string(),
            "version": manifest.toolchain_version,
            "toolchain": report.toolchain.display().to_string(),
            "packages": report.packages,
            "built": report.built,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::commands::{mkenv, MkenvRequest};
    use crate::config::GlobalOptions;
    use crate::environment::tests::seed_version;
    use crate::outcome::CommandStatus;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{"environment_name":"sample","environment_toolchain_version":"1.3.2","environment_packages":[{"package_name":"test","package_url":"test.example/test","package_vcs":"hg","package_vcs_revision":"0000000000000000000000000000000000000000"}]}"#;

    #[cfg(unix)]
    #[test]
    fn export_defaults_to_the_active_environment_and_guards_overwrites() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), Some("dev"));
        seed_version(ctx.cache(), "1.3.2");
        mkenv(
            &ctx,
            &MkenvRequest {
                name: "dev".into(),
                version: "1.3.2".into(),
                prompt: None,
                force: false,
            },
        )
        .expect("mkenv");

        let outcome = export(&ctx, &ExportRequest::default()).expect("export");
        assert_eq!(outcome.status, CommandStatus::Ok);
        let written = temp.path().join("home/dev").join(DEFAULT_MANIFEST_NAME);
        let manifest = EnvironmentManifest::from_json(
            &fs::read_to_string(&written).expect("manifest"),
        )
        .expect("parse");
        assert_eq!(manifest.name, "dev");
        assert_eq!(manifest.toolchain_version, "1.3.2");
        assert!(manifest.packages.is_empty());

        let again = export(&ctx, &ExportRequest::default()).expect("export");
        assert_eq!(again.details["code"], "GOVE205");
        let forced = export(
            &ctx,
            &ExportRequest {
                prettify: true,
                force: true,
                ..ExportRequest::default()
            },
        )
        .expect("export");
        assert_eq!(forced.status, CommandStatus::Ok);
        assert!(fs::read_to_string(&written)
            .expect("manifest")
            .contains("\n  \"environment_name\""));
    }

    #[test]
    fn export_without_environment_is_a_user_error() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        let outcome = export(&ctx, &ExportRequest::default()).expect("export");
        assert_eq!(outcome.status, CommandStatus::UserError);
    }

    #[cfg(unix)]
    #[test]
    fn import_replays_the_sample_manifest() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        let target = seed_version(ctx.cache(), "1.3.2");
        let file = temp.path().join("sample.json");
        fs::write(&file, SAMPLE).expect("manifest");

        let request = ImportRequest {
            manifest: file,
            prompt: Some("[sample]".into()),
            force: false,
        };
        let outcome = import(&ctx, &request).expect("import");
        assert_eq!(outcome.status, CommandStatus::Ok);
        let root = temp.path().join("home/sample");
        assert_eq!(fs::read_link(root.join("lib")).expect("link"), target);
        assert!(root.join("src/test.example/test/.hg").is_dir());
        assert!(fs::read_to_string(root.join("bin/activate"))
            .expect("activate")
            .contains("[sample]"));

        let again = import(&ctx, &request).expect("import");
        assert_eq!(again.details["code"], "GOVE201");
    }

    #[cfg(unix)]
    #[test]
    fn export_writes_only_inside_the_environment() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        seed_version(ctx.cache(), "1.3.2");
        mkenv(
            &ctx,
            &MkenvRequest {
                name: "dev".into(),
                version: "1.3.2".into(),
                prompt: None,
                force: false,
            },
        )
        .expect("mkenv");

        for name in ["../x", "/tmp/x", "..", "sub/x"] {
            let outcome = export(
                &ctx,
                &ExportRequest {
                    environment: Some("dev".into()),
                    name: Some(name.into()),
                    force: true,
                    ..ExportRequest::default()
                },
            )
            .expect("export");
            assert_eq!(outcome.details["code"], "GOVE208", "{name}");
        }
        assert!(!temp.path().join("home/x").exists());

        let outcome = export(
            &ctx,
            &ExportRequest {
                environment: Some("../home".into()),
                ..ExportRequest::default()
            },
        )
        .expect("export");
        assert_eq!(outcome.details["code"], "GOVE207");
        assert!(!temp.path().join(DEFAULT_MANIFEST_NAME).exists());
    }

    #[test]
    fn forced_import_refuses_the_active_environment() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), Some("sample"));
        seed_version(ctx.cache(), "1.3.2");
        let kept = temp.path().join("home/sample/src/kept");
        fs::create_dir_all(&kept).expect("existing");
        let file = temp.path().join("sample.json");
        fs::write(&file, SAMPLE).expect("manifest");

        let outcome = import(
            &ctx,
            &ImportRequest {
                manifest: file,
                prompt: None,
                force: true,
            },
        )
        .expect("import");
        assert_eq!(outcome.details["code"], "GOVE203");
        assert!(kept.is_dir());
    }

    #[test]
    fn malformed_manifests_are_rejected() {
        let temp = tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, temp.path(), None);
        let file = temp.path().join("bad.json");
        fs::write(&file, r#"{"environment_name":"x"}"#).expect("manifest");
        let outcome = import(
            &ctx,
            &ImportRequest {
                manifest: file,
                prompt: None,
                force: false,
            },
        )
        .expect("import");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert!(!temp.path().join("home/x").exists());
    }
}
