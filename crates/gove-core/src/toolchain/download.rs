use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use sha1::{Digest, Sha1};
use tar::Archive;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::ZipArchive;

use crate::config::NetworkConfig;

pub(crate) const GOVE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Archive downloads block until the transfer finishes or fails.
const DOWNLOAD_TIMEOUT: Option<Duration> = None;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub(crate) fn from_name(name: &str) -> Self {
        if name.ends_with(".zip") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }
}

pub(crate) fn build_http_client(network: &NetworkConfig) -> Result<Client> {
    let builder = Client::builder()
        .user_agent(format!("gove/{GOVE_VERSION}"))
        .timeout(DOWNLOAD_TIMEOUT);
    let builder = if network.keep_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}

/// Streams `url` into a temporary file.
pub(crate) fn download_to_temp(client: &Client, url: &str) -> Result<NamedTempFile> {
    debug!(%url, "downloading toolchain archive");
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()
        .with_context(|| format!("failed to download {url}"))?;
    let mut tmp = NamedTempFile::new().context("failed to create download buffer")?;
    let bytes = response
        .copy_to(&mut tmp)
        .with_context(|| format!("failed to read {url}"))?;
    debug!(%url, bytes, "download finished");
    Ok(tmp)
}

/// Lowercase hex SHA-1 of a file's bytes.
pub(crate) fn sha1_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Unpacks `archive` into `dest`, dropping the leading `go/` directory so
/// `dest` becomes the toolchain root.
pub(crate) fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    match kind {
        ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        ArchiveKind::Zip => extract_zip(archive, dest),
    }
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    for entry in tar.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("corrupt archive entry")?;
        let name = entry.path().context("archive entry has no path")?.into_owned();
        let Some(relative) = strip_root(&name)? else {
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        entry
            .unpack(&target)
            .with_context(|| format!("failed to unpack {}", target.display()))?;
    }
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let mut zip = ZipArchive::new(file).context("failed to read zip archive")?;
    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx).context("corrupt zip entry")?;
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            bail!("zip entry `{}` escapes the archive root", entry.name());
        };
        let Some(relative) = strip_root(&name)? else {
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out =
            File::create(&target).with_context(|| format!("failed to create {}", target.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to write {}", target.display()))?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .with_context(|| format!("failed to chmod {}", target.display()))?;
        }
    }
    Ok(())
}

/// Path below the archive's `go/` root, or `None` for the root itself.
fn strip_root(name: &Path) -> Result<Option<PathBuf>> {
    let mut components = name.components().peekable();
    if components.peek().is_some_and(|first| first.as_os_str() == "go") {
        components.next();
    }
    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => bail!("archive entry `{}` escapes the archive root", name.display()),
        }
    }
    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use tempfile::tempdir;

    /// Builds a `go/`-rooted tarball the way release archives are laid out.
    pub(crate) fn release_tarball(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder
                .append_data(&mut header, format!("go/{path}"), *contents)
                .expect("append");
        }
        builder
            .into_inner()
            .expect("tar")
            .finish()
            .expect("gzip")
    }

    #[test]
    fn tarball_is_unpacked_without_the_go_prefix() {
        let temp = tempdir().expect("tempdir");
        let bytes = release_tarball(&[
            ("bin/go", b"#!/bin/sh\n".as_slice(), 0o755),
            ("src/make.bash", b"#!/bin/sh\n".as_slice(), 0o755),
        ]);
        let archive = temp.path().join("go.tar.gz");
        fs::write(&archive, bytes).expect("archive");
        let dest = temp.path().join("out");
        extract_archive(&archive, &dest, ArchiveKind::TarGz).expect("extract");
        assert!(dest.join("bin/go").is_file());
        assert!(dest.join("src/make.bash").is_file());
        assert!(!dest.join("go").exists());
    }

    #[test]
    fn strip_root_rejects_traversal() {
        assert_eq!(
            strip_root(Path::new("go/src/run.bash")).expect("strip"),
            Some(PathBuf::from("src/run.bash"))
        );
        assert_eq!(strip_root(Path::new("go/")).expect("root"), None);
        assert!(strip_root(Path::new("go/../../etc/passwd")).is_err());
    }

    #[test]
    fn downloads_have_no_deadline() {
        assert_eq!(DOWNLOAD_TIMEOUT, None);
        let network = NetworkConfig {
            download_url: "http://127.0.0.1:9".into(),
            legacy_download_url: "http://127.0.0.1:9".into(),
            git_repo: String::new(),
            keep_proxies: false,
        };
        build_http_client(&network).expect("client");
    }

    #[test]
    fn sha1_matches_known_digest() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("empty");
        fs::write(&path, b"").expect("write");
        assert_eq!(
            sha1_file(&path).expect("hash"),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }
}
