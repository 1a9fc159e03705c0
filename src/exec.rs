//! Thin wrappers around external programs (`git`, `7z`).
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::SourceError;

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn spawn_error(e: &std::io::Error, program: &str, label: &str) -> SourceError {
    if e.kind() == std::io::ErrorKind::NotFound {
        SourceError::MissingTool(program.to_string())
    } else {
        SourceError::Command {
            command: label.to_string(),
            stderr: e.to_string(),
        }
    }
}

/// Execute a command and return the result, failing on non-zero exit.
fn execute_checked(mut cmd: Command, program: &str, label: &str) -> Result<ExecResult, SourceError> {
    let output = cmd.output().map_err(|e| spawn_error(&e, program, label))?;
    check_exit(ExecResult::from(output), label)
}

fn check_exit(result: ExecResult, label: &str) -> Result<ExecResult, SourceError> {
    if !result.success {
        return Err(SourceError::Command {
            command: format!("{label} (exit {})", result.code.unwrap_or(-1)),
            stderr: result.stderr.trim().to_string(),
        });
    }
    Ok(result)
}

/// Run a command and return its output. Fails if the command exits non-zero.
///
/// # Errors
///
/// Returns [`SourceError::MissingTool`] if `program` cannot be found and
/// [`SourceError::Command`] if it fails.
pub fn run(program: &str, args: &[&str]) -> Result<ExecResult, SourceError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    execute_checked(cmd, program, program)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).ok();
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Run a command, optionally in `dir`, and kill it if it has not exited
/// within `timeout`.
///
/// # Errors
///
/// Returns [`SourceError::Timeout`] if the command was killed, otherwise
/// the same errors as [`run`].
pub fn run_with_timeout(
    dir: Option<&Path>,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<ExecResult, SourceError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let label = match dir {
        Some(dir) => {
            cmd.current_dir(dir);
            format!("{program} in {}", dir.display())
        }
        None => program.to_string(),
    };

    let mut child = cmd.spawn().map_err(|e| spawn_error(&e, program, &label))?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                if let Err(e) = child.kill() {
                    tracing::debug!("cannot kill {label}: {e}");
                }
                child.wait().ok();
                return Err(SourceError::Timeout {
                    command: label,
                    seconds: timeout.as_secs(),
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(SourceError::Command {
                    command: label,
                    stderr: e.to_string(),
                });
            }
        }
    };

    let output = Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    check_exit(ExecResult::from(output), &label)
}

/// Locate `program` on PATH.
///
/// # Errors
///
/// Returns [`SourceError::MissingTool`] if it is not installed.
pub fn require(program: &str) -> Result<PathBuf, SourceError> {
    ::which::which(program).map_err(|_| SourceError::MissingTool(program.to_string()))
}
