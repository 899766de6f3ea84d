use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gove_domain::VcsKind;
use tracing::{debug, info};

use crate::effects::{OutputSink, ProcessRunner};
use crate::errors::GoveError;

/// Branch checked out for the moving `go`/`tip` names.
const TIP_BRANCH: &str = "master";

/// Clones the upstream repository into `repo`, or fetches new tags when it is
/// already there.
pub(crate) fn sync_repo(
    repo: &Path,
    url: &str,
    runner: &dyn ProcessRunner,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<()> {
    let (args, cwd) = if repo.join(".git").is_dir() {
        debug!(repo = %repo.display(), "fetching upstream tags");
        (vec!["fetch".to_string(), "--tags".to_string(), "origin".to_string()], repo)
    } else {
        info!(%url, "cloning upstream toolchain repository");
        let parent = repo
            .parent()
            .with_context(|| format!("{} has no parent directory", repo.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        (VcsKind::Git.clone_args(url, repo), parent)
    };
    run_git(&args, cwd, url, "HEAD", runner, sink)
}

/// Release tags known to the local upstream clone; weekly snapshots are skipped.
pub(crate) fn list_tags(repo: &Path, runner: &dyn ProcessRunner) -> Result<Vec<String>> {
    if !repo.join(".git").is_dir() {
        return Ok(Vec::new());
    }
    let output = runner.run("git", &["tag".to_string()], &[], repo)?;
    if !output.success() {
        return Err(GoveError::VcsQuery {
            vcs: VcsKind::Git,
            path: repo.to_path_buf(),
            detail: output.tail(),
        }
        .into());
    }
    let mut tags: Vec<String> = output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && !tag.starts_with("weekly"))
        .map(ToString::to_string)
        .collect();
    tags.sort();
    Ok(tags)
}

pub(crate) fn is_moving_name(tag: &str) -> bool {
    matches!(tag, "go" | "tip")
}

pub(crate) fn checkout(
    repo: &Path,
    tag: &str,
    runner: &dyn ProcessRunner,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<()> {
    let revision = if is_moving_name(tag) { TIP_BRANCH } else { tag };
    let url = repo.display().to_string();
    run_git(&VcsKind::Git.update_args(revision), repo, &url, revision, runner, sink)
}

fn run_git(
    args: &[String],
    cwd: &Path,
    locator: &str,
    revision: &str,
    runner: &dyn ProcessRunner,
    sink: Option<&Arc<dyn OutputSink>>,
) -> Result<()> {
    let output = runner.run_with("git", args, &[], cwd, sink)?;
    if output.success() {
        return Ok(());
    }
    Err(GoveError::VcsClone {
        vcs: VcsKind::Git,
        locator: locator.to_string(),
        revision: revision.to_string(),
        detail: output.tail(),
    }
    .into())
}
