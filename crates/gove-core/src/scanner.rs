use std::path::Path;

use anyhow::Result;
use gove_domain::{PackageManifest, VcsKind};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::effects::VcsAdapter;

/// Finds every version-controlled directory under `workspace` and pins it
/// to its current revision. Packages come back sorted by import path.
///
/// Repositories nested inside another package are reported as packages of
/// their own.
///
/// # Errors
/// Returns the first revision query failure.
pub fn scan_packages(workspace: &Path, vcs: &dyn VcsAdapter) -> Result<Vec<PackageManifest>> {
    if !workspace.is_dir() {
        debug!(workspace = %workspace.display(), "no workspace to scan");
        return Ok(Vec::new());
    }
    let walker = WalkDir::new(workspace)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry
                .file_name()
                .to_str()
                .is_some_and(VcsKind::is_marker)
        });

    let mut packages = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(kind) = vcs.probe(entry.path()) else {
            continue;
        };
        let Some(import_path) = import_path(workspace, entry.path()) else {
            warn!(path = %entry.path().display(), "skipping package with a non UTF-8 path");
            continue;
        };
        let revision = vcs.capture_revision(kind, entry.path())?;
        debug!(package = %import_path, vcs = %kind, %revision, "found package");
        packages.push(PackageManifest::new(&import_path, kind, revision));
    }
    Ok(packages)
}

/// Workspace-relative path joined with `/` on every platform.
fn import_path(workspace: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(workspace).ok()?;
    let parts = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
