use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gove_domain::{resolve_locator, VcsKind, SENTINEL_REVISION};
use tracing::{debug, warn};

use crate::effects::{OutputSink, ProcessRunner, VcsAdapter};
use crate::errors::GoveError;
use crate::fs::remove_dir_all_writable;

/// File dropped inside a marker directory by sentinel checkouts.
const SENTINEL_STAMP: &str = "gove-sentinel";

/// Runs the real `git`, `hg`, `bzr` and `svn` executables.
pub struct SystemVcs {
    runner: Arc<dyn ProcessRunner>,
}

impl SystemVcs {
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    fn describe_spawn_failure(kind: VcsKind, err: &anyhow::Error) -> String {
        if which::which(kind.program()).is_err() {
            format!("{} is not installed or not on PATH", kind.program())
        } else {
            format!("{err:#}")
        }
    }
}

impl VcsAdapter for SystemVcs {
    fn capture_revision(&self, kind: VcsKind, dir: &Path) -> Result<String> {
        if is_sentinel_checkout(kind, dir) {
            return Ok(String::new());
        }
        let query_error = |detail: String| GoveError::VcsQuery {
            vcs: kind,
            path: dir.to_path_buf(),
            detail,
        };
        let output = self
            .runner
            .run(kind.program(), &kind.revision_args(), &[], dir)
            .map_err(|err| query_error(Self::describe_spawn_failure(kind, &err)))?;
        if !output.success() {
            return Err(query_error(output.tail()).into());
        }
        let revision = kind
            .parse_revision(&output.stdout)
            .ok_or_else(|| query_error("no revision in tool output".to_string()))?;
        debug!(vcs = %kind, path = %dir.display(), %revision, "captured revision");
        Ok(revision)
    }

    fn clone_at_revision(
        &self,
        kind: VcsKind,
        locator: &str,
        dest: &Path,
        revision: &str,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<()> {
        if revision == SENTINEL_REVISION {
            let marker = dest.join(kind.marker());
            fs::create_dir_all(&marker)
                .with_context(|| format!("failed to create {}", marker.display()))?;
            fs::write(marker.join(SENTINEL_STAMP), SENTINEL_REVISION)
                .with_context(|| format!("failed to stamp {}", marker.display()))?;
            return Ok(());
        }

        let parent = dest
            .parent()
            .with_context(|| format!("{} has no parent directory", dest.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let url = resolve_locator(locator);
        let clone_error = |detail: String| GoveError::VcsClone {
            vcs: kind,
            locator: locator.to_string(),
            revision: revision.to_string(),
            detail,
        };

        debug!(vcs = %kind, %url, dest = %dest.display(), "cloning package");
        let steps = [
            (kind.clone_args(&url, dest), parent),
            (kind.update_args(revision), dest),
        ];
        for (args, cwd) in &steps {
            let result = self.runner.run_with(kind.program(), args, &[], cwd, sink);
            let failure = match result {
                Ok(output) if output.success() => continue,
                Ok(output) => output.tail(),
                Err(err) => Self::describe_spawn_failure(kind, &err),
            };
            if let Err(cleanup) = remove_dir_all_writable(dest) {
                warn!(dest = %dest.display(), error = %cleanup, "failed to remove partial clone");
            }
            return Err(clone_error(failure).into());
        }
        Ok(())
    }
}

fn is_sentinel_checkout(kind: VcsKind, dir: &Path) -> bool {
    fs::read_to_string(dir.join(kind.marker()).join(SENTINEL_STAMP))
        .is_ok_and(|stamp| stamp.trim() == SENTINEL_REVISION)
}
