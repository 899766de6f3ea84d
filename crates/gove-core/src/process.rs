use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
    process::{Command, Stdio},
    sync::Arc,
    thread,
};

use anyhow::{Context, Result};

use crate::effects::OutputSink;

const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Last few lines of stderr (or stdout when stderr is empty) for error messages.
    #[must_use]
    pub fn tail(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = source.trim_end().lines().collect();
        let start = lines.len().saturating_sub(5);
        let tail = lines[start..].join("\n");
        if tail.is_empty() {
            format!("exit status {}", self.code)
        } else {
            tail
        }
    }
}

/// Execute a program in `cwd` and capture stdout/stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
) -> Result<RunOutput> {
    let mut command = configured_command(program, args, envs, cwd);
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;
    let stdout_handle = thread::spawn(move || read_to_string_limited(stdout));
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;
    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Execute a program while forwarding each output line to `sink`.
///
/// Output is still captured so callers can report failures. Lines from the
/// two streams may interleave in any order; the exit code is what counts.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or its output streams
/// cannot be read.
pub fn run_command_streaming(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
    sink: Arc<dyn OutputSink>,
) -> Result<RunOutput> {
    let mut command = configured_command(program, args, envs, cwd);
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;

    let out_sink = Arc::clone(&sink);
    let stdout_handle = thread::spawn(move || tee_lines(stdout, out_sink.as_ref()));
    let stderr_handle = thread::spawn(move || tee_lines(stderr, sink.as_ref()));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;

    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

fn configured_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.current_dir(cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command
}

fn read_to_string_limited<R: Read>(mut reader: R) -> Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        let room = MAX_CAPTURE_BYTES.saturating_sub(buf.len());
        if room < read {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..read.min(room)]);
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str("\n[...truncated...]\n");
    }
    Ok(text)
}

fn tee_lines<R: Read>(reader: R, sink: &dyn OutputSink) -> Result<String> {
    let mut captured = String::new();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        sink.line(text.trim_end_matches(['\n', '\r']));
        if captured.len() + text.len() <= MAX_CAPTURE_BYTES {
            captured.push_str(&text);
        }
    }
    Ok(captured)
}
