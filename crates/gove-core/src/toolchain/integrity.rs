use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = ".gove-manifest";

#[derive(Debug, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// No manifest yet: the install never finished.
    Unverified,
    Mismatch(PathBuf),
}

/// Writes `<sha256> <path>` for every non-directory entry under `root`.
///
/// # Errors
/// Returns an error if the tree cannot be walked or the manifest written.
pub fn generate_manifest(root: &Path) -> Result<usize> {
    let manifest_path = root.join(MANIFEST_FILE);
    let staged = root.join(format!("{MANIFEST_FILE}.tmp"));
    let mut lines = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_dir() || entry.path() == manifest_path || entry.path() == staged {
            continue;
        }
        let digest = hash_entry(entry.path())
            .with_context(|| format!("failed to hash {}", entry.path().display()))?;
        lines.push(format!("{digest} {}", entry.path().display()));
    }

    let mut file =
        File::create(&staged).with_context(|| format!("failed to create {}", staged.display()))?;
    let mut contents = lines.join("\n");
    contents.push('\n');
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", staged.display()))?;
    file.sync_all().ok();
    fs::rename(&staged, &manifest_path)
        .with_context(|| format!("failed to move manifest into {}", manifest_path.display()))?;
    debug!(path = %manifest_path.display(), files = lines.len(), "wrote integrity manifest");
    Ok(lines.len())
}

/// Re-hashes every file listed in the manifest under `root`.
///
/// # Errors
/// Returns an error only when the manifest exists but cannot be read.
pub fn verify_manifest(root: &Path) -> Result<Verification> {
    let manifest_path = root.join(MANIFEST_FILE);
    let contents = match fs::read_to_string(&manifest_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Verification::Unverified),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", manifest_path.display()))
        }
    };
    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        let Some((expected, path)) = line.split_once(' ') else {
            warn!(path = %manifest_path.display(), "malformed integrity manifest line");
            return Ok(Verification::Mismatch(manifest_path));
        };
        let path = PathBuf::from(path);
        match hash_entry(&path) {
            Ok(actual) if actual == expected => {}
            Ok(actual) => {
                warn!(path = %path.display(), %expected, %actual, "integrity check failed");
                return Ok(Verification::Mismatch(path));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "integrity check failed");
                return Ok(Verification::Mismatch(path));
            }
        }
    }
    Ok(Verification::Verified)
}

fn hash_entry(path: &Path) -> io::Result<String> {
    let meta = fs::symlink_metadata(path)?;
    let mut hasher = Sha256::new();
    if meta.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        hasher.update(target.to_string_lossy().as_bytes());
    } else {
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut hasher)?;
    }
    Ok(hex::encode(hasher.finalize()))
}
