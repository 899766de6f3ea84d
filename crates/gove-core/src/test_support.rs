use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::effects::{Effects, OutputSink, ProcessRunner, StderrSink, VcsAdapter};
use crate::process::RunOutput;
use crate::vcs::SystemVcs;

#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: PathBuf,
}

impl Call {
    pub(crate) fn env(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

type Handler = Box<dyn Fn(&str, &[String], &Path) -> RunOutput + Send + Sync>;

/// Records every spawn and answers from a handler instead of running anything.
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<Call>>,
    handler: Handler,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::with_handler(|_, _, _| RunOutput::default())
    }
}

impl FakeRunner {
    pub(crate) fn with_handler(
        handler: impl Fn(&str, &[String], &Path) -> RunOutput + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                program: program.to_string(),
                args: args.to_vec(),
                envs: envs.to_vec(),
                cwd: cwd.to_path_buf(),
            });
        }
        Ok((self.handler)(program, args, cwd))
    }

    fn run_streaming(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
        _sink: Arc<dyn OutputSink>,
    ) -> Result<RunOutput> {
        self.run(program, args, envs, cwd)
    }
}

/// Effects wired to a [`FakeRunner`]; VCS calls go through [`SystemVcs`]
/// so sentinel handling and argument building stay real.
pub(crate) struct FakeEffects {
    pub runner: Arc<FakeRunner>,
    vcs: SystemVcs,
}

impl FakeEffects {
    pub(crate) fn new(runner: FakeRunner) -> Self {
        let runner = Arc::new(runner);
        Self {
            vcs: SystemVcs::new(runner.clone()),
            runner,
        }
    }
}

impl Effects for FakeEffects {
    fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    fn vcs(&self) -> &dyn VcsAdapter {
        &self.vcs
    }

    fn sink(&self) -> Arc<dyn OutputSink> {
        Arc::new(StderrSink)
    }
}
