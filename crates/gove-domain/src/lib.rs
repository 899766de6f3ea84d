#![deny(clippy::all, warnings)]

pub mod checksums;
pub mod manifest;
pub mod vcs;
pub mod version;

pub use checksums::{FingerprintTable, UnknownVersion};
pub use manifest::{
    is_environment_name, is_plain_name, is_toolchain_name, EnvironmentManifest, ManifestError,
    PackageManifest, RESERVED_CACHE_NAMES, RESERVED_HOME_NAMES,
};
pub use vcs::{resolve_locator, VcsKind, SENTINEL_REVISION};
pub use version::{
    archive_name, binary_version_name, host_platform, normalize_tag, release_url, HostPlatform,
    InstallMode, ReleaseVersion,
};
