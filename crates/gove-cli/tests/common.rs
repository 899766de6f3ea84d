#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use gove_core::toolchain::integrity::generate_manifest;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway `GOVE_HOME` and `GOVE_CACHE_HOME` pair.
pub struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("tempdir");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn cache(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn gove(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("gove");
        cmd.env("GOVE_HOME", self.home())
            .env("GOVE_CACHE_HOME", self.cache())
            .env("GOVE_DOWNLOAD_URL", "http://127.0.0.1:9")
            .env("GOVE_GIT_REPO", self.root().join("no-upstream"))
            .env_remove("GOVE_ENV")
            .env("NO_COLOR", "1")
            .current_dir(self.root());
        cmd
    }

    /// Lays out a finished toolchain under the cache with a valid manifest.
    pub fn seed_version(&self, name: &str) -> PathBuf {
        let root = self.cache().join(name);
        fs::create_dir_all(root.join("bin")).expect("bin");
        fs::write(root.join("bin/go"), format!("#!/bin/sh\necho {name}\n")).expect("go");
        fs::write(root.join("VERSION"), name).expect("version");
        generate_manifest(&root).expect("manifest");
        root
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}
