use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Deterministic revision used by fixtures; never handed to a real tool.
pub const SENTINEL_REVISION: &str = "0000000000000000000000000000000000000000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Hg,
    Bzr,
    Svn,
}

impl VcsKind {
    /// Probe order. A directory carrying several markers resolves to the
    /// first entry here.
    pub const PRECEDENCE: [VcsKind; 4] = [VcsKind::Git, VcsKind::Hg, VcsKind::Bzr, VcsKind::Svn];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Hg => "hg",
            VcsKind::Bzr => "bzr",
            VcsKind::Svn => "svn",
        }
    }

    /// Executable invoked for this backend.
    #[must_use]
    pub const fn program(self) -> &'static str {
        self.name()
    }

    /// Metadata directory that marks a working tree.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Hg => ".hg",
            VcsKind::Bzr => ".bzr",
            VcsKind::Svn => ".svn",
        }
    }

    /// Returns the backend owning `dir`, if any marker directory is present.
    #[must_use]
    pub fn probe(dir: &Path) -> Option<VcsKind> {
        Self::PRECEDENCE
            .into_iter()
            .find(|kind| dir.join(kind.marker()).is_dir())
    }

    #[must_use]
    pub fn is_marker(name: &str) -> bool {
        Self::PRECEDENCE.iter().any(|kind| kind.marker() == name)
    }

    #[must_use]
    pub fn revision_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            VcsKind::Git => &["rev-parse", "--verify", "HEAD"],
            VcsKind::Hg => &["--debug", "id", "-i"],
            VcsKind::Bzr => &["revno"],
            VcsKind::Svn => &["info"],
        };
        args.iter().map(ToString::to_string).collect()
    }

    /// Extracts the revision from the output of [`VcsKind::revision_args`].
    #[must_use]
    pub fn parse_revision(self, stdout: &str) -> Option<String> {
        let revision = match self {
            VcsKind::Svn => stdout.lines().find_map(|line| {
                line.strip_prefix("Revision:")
                    .map(|value| value.trim().to_string())
            })?,
            VcsKind::Git | VcsKind::Hg | VcsKind::Bzr => stdout.trim().to_string(),
        };
        if revision.is_empty() {
            None
        } else {
            Some(revision)
        }
    }

    #[must_use]
    pub fn clone_args(self, url: &str, dest: &Path) -> Vec<String> {
        let verb = match self {
            VcsKind::Git | VcsKind::Hg => "clone",
            VcsKind::Bzr => "branch",
            VcsKind::Svn => "checkout",
        };
        vec![
            verb.to_string(),
            url.to_string(),
            dest.display().to_string(),
        ]
    }

    /// Arguments that move an existing working tree to `revision`.
    #[must_use]
    pub fn update_args(self, revision: &str) -> Vec<String> {
        match self {
            VcsKind::Git => vec!["checkout".into(), revision.to_string()],
            VcsKind::Hg => vec!["update".into(), "-r".into(), revision.to_string()],
            VcsKind::Bzr => vec![
                "update".into(),
                "-r".into(),
                format!("revno:{revision}"),
            ],
            VcsKind::Svn => vec!["up".into(), format!("-r{revision}")],
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VcsKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::PRECEDENCE
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown version control system `{value}`"))
    }
}

/// Turns a package import path into something a VCS tool can clone.
///
/// Locators that already carry a scheme pass through untouched; bare import
/// paths such as `github.com/user/repo` are fetched over https.
#[must_use]
pub fn resolve_locator(locator: &str) -> String {
    match Url::parse(locator) {
        Ok(url) if locator.contains("://") => url.to_string(),
        _ => format!("https://{}", locator.trim_start_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn git_wins_over_hg_when_both_markers_exist() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join(".hg")).expect("hg marker");
        fs::create_dir(temp.path().join(".git")).expect("git marker");
        assert_eq!(VcsKind::probe(temp.path()), Some(VcsKind::Git));
    }

    #[test]
    fn probe_ignores_marker_files_and_plain_dirs() {
        let temp = tempdir().expect("tempdir");
        assert_eq!(VcsKind::probe(temp.path()), None);
        fs::write(temp.path().join(".git"), "gitdir: elsewhere").expect("file marker");
        assert_eq!(VcsKind::probe(temp.path()), None);
        fs::create_dir(temp.path().join(".bzr")).expect("bzr marker");
        assert_eq!(VcsKind::probe(temp.path()), Some(VcsKind::Bzr));
    }

    #[test]
    fn svn_revision_comes_from_info_block() {
        let info = "Path: .\nURL: svn://example/trunk\nRevision: 1432\nNode Kind: directory\n";
        assert_eq!(VcsKind::Svn.parse_revision(info).as_deref(), Some("1432"));
        assert_eq!(VcsKind::Svn.parse_revision("Path: .\n"), None);
        assert_eq!(
            VcsKind::Git.parse_revision("  3f2a9c\n").as_deref(),
            Some("3f2a9c")
        );
        assert_eq!(VcsKind::Hg.parse_revision("\n"), None);
    }

    #[test]
    fn update_commands_follow_each_backend() {
        assert_eq!(VcsKind::Git.update_args("abc"), ["checkout", "abc"]);
        assert_eq!(VcsKind::Hg.update_args("abc"), ["update", "-r", "abc"]);
        assert_eq!(VcsKind::Bzr.update_args("12"), ["update", "-r", "revno:12"]);
        assert_eq!(VcsKind::Svn.update_args("12"), ["up", "-r12"]);
        assert_eq!(
            VcsKind::Bzr.clone_args("https://x/y", Path::new("/tmp/y"))[0],
            "branch"
        );
    }

    #[test]
    fn kinds_serialize_lowercase() {
        let encoded = serde_json::to_string(&VcsKind::Hg).expect("encode");
        assert_eq!(encoded, "\"hg\"");
        assert!(serde_json::from_str::<VcsKind>("\"cvs\"").is_err());
        assert_eq!("SVN".parse::<VcsKind>().expect("parse"), VcsKind::Svn);
    }

    #[test]
    fn bare_import_paths_resolve_to_https() {
        assert_eq!(
            resolve_locator("github.com/user/repo"),
            "https://github.com/user/repo"
        );
        assert_eq!(
            resolve_locator("ssh://hg@example.org/repo"),
            "ssh://hg@example.org/repo"
        );
    }
}
