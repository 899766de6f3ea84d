use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use gove_domain::VcsKind;

use crate::process::{self, RunOutput};
use crate::vcs::SystemVcs;

/// Receives subprocess output line by line.
pub trait OutputSink: Send + Sync {
    fn line(&self, text: &str);
}

pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput>;

    fn run_streaming(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<RunOutput>;

    /// Streams to `sink` when one is given, otherwise captures silently.
    fn run_with(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<RunOutput> {
        match sink {
            Some(sink) => self.run_streaming(program, args, envs, cwd, Arc::clone(sink)),
            None => self.run(program, args, envs, cwd),
        }
    }
}

/// Uniform access to the four supported version control tools.
pub trait VcsAdapter: Send + Sync {
    /// Backend owning `dir`, resolved in [`VcsKind::PRECEDENCE`] order.
    fn probe(&self, dir: &Path) -> Option<VcsKind> {
        VcsKind::probe(dir)
    }

    /// Current revision of the working tree at `dir`.
    fn capture_revision(&self, kind: VcsKind, dir: &Path) -> Result<String>;

    /// Fetches `locator` into `dest` so that its captured revision is `revision`.
    fn clone_at_revision(
        &self,
        kind: VcsKind,
        locator: &str,
        dest: &Path,
        revision: &str,
        sink: Option<&Arc<dyn OutputSink>>,
    ) -> Result<()>;
}

pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn ProcessRunner;
    fn vcs(&self) -> &dyn VcsAdapter;
    fn sink(&self) -> Arc<dyn OutputSink>;
}

pub type SharedEffects = Arc<dyn Effects>;

#[derive(Default)]
pub struct SystemProcess;

impl ProcessRunner for SystemProcess {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        process::run_command(program, args, envs, cwd)
    }

    fn run_streaming(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<RunOutput> {
        process::run_command_streaming(program, args, envs, cwd, sink)
    }
}

/// Writes subprocess output to stderr so stdout stays parseable.
#[derive(Default)]
pub struct StderrSink;

impl OutputSink for StderrSink {
    fn line(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{text}");
    }
}

pub struct SystemEffects {
    runner: Arc<SystemProcess>,
    vcs: SystemVcs,
    sink: Arc<dyn OutputSink>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        let runner = Arc::new(SystemProcess);
        Self {
            vcs: SystemVcs::new(runner.clone()),
            runner,
            sink: Arc::new(StderrSink),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    fn vcs(&self) -> &dyn VcsAdapter {
        &self.vcs
    }

    fn sink(&self) -> Arc<dyn OutputSink> {
        Arc::clone(&self.sink)
    }
}
