//! Execution of apply-sequence command lines.
//!
//! Every step is handed to a [`CommandRunner`] as a rendered shell command
//! line. [`ShellRunner`] runs it through the configured command interpreter
//! (`sh -c <line>`) with the watch directory as working directory and blocks
//! until it exits. The child's stderr is copied to ours as it arrives and
//! captured for error classification. [`DryRunRunner`] runs nothing and
//! reports success.
//!
//! Runners only report what happened. Deciding whether a failure stops the
//! sequence is up to the caller (see `apply`).

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::{Result, UpdateError};
use crate::step::Step;

/// Exit information for one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stderr: String,
}

impl StepOutcome {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stderr: stderr.into(),
        }
    }
}

pub trait CommandRunner {
    /// Run `command` for `step` inside `cwd` and wait for it to finish.
    ///
    /// Returns `Err` only when the command could not be started at all.
    fn run(&mut self, step: Step, command: &OsStr, cwd: &Path) -> Result<StepOutcome>;
}

// ---------------------------------------------------------------------------
// ShellRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    stdout_to_stderr: bool,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            stdout_to_stderr: false,
        }
    }

    /// Send the commands' stdout to our stderr, for when stdout carries
    /// machine-readable output.
    pub fn stdout_to_stderr(mut self) -> Self {
        self.stdout_to_stderr = true;
        self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, step: Step, command: &OsStr, cwd: &Path) -> Result<StepOutcome> {
        let stdout = if self.stdout_to_stderr {
            Stdio::from(std::io::stderr())
        } else {
            Stdio::inherit()
        };
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| UpdateError::SpawnFailed { step, source })?;

        let tee = child.stderr.take().map(tee_stderr);
        let status = child
            .wait()
            .map_err(|source| UpdateError::SpawnFailed { step, source })?;
        let stderr = tee
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        Ok(StepOutcome {
            code: status.code(),
            success: status.success(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Forward the child's stderr as it is written and keep a copy.
fn tee_stderr(mut pipe: ChildStderr) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = std::io::stderr().write_all(&buf[..n]);
                    captured.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        captured
    })
}

// ---------------------------------------------------------------------------
// DryRunRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&mut self, step: Step, command: &OsStr, _cwd: &Path) -> Result<StepOutcome> {
        tracing::debug!(%step, command = %command.to_string_lossy(), "dry run, not executing");
        Ok(StepOutcome::ok())
    }
}

// ---------------------------------------------------------------------------
// RecordingRunner (tests)
// ---------------------------------------------------------------------------

/// Records every command and answers with canned outcomes.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingRunner {
    pub calls: Vec<(Step, String)>,
    pub outcomes: std::collections::HashMap<Step, StepOutcome>,
    pub unspawnable: Vec<Step>,
}

#[cfg(test)]
impl RecordingRunner {
    pub fn failing(mut self, step: Step, outcome: StepOutcome) -> Self {
        self.outcomes.insert(step, outcome);
        self
    }

    pub fn failing_all(mut self) -> Self {
        for &step in Step::all() {
            self.outcomes
                .insert(step, StepOutcome::failed(1, "simulated failure"));
        }
        self
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls.iter().map(|(s, _)| *s).collect()
    }
}

#[cfg(test)]
impl CommandRunner for RecordingRunner {
    fn run(&mut self, step: Step, command: &OsStr, _cwd: &Path) -> Result<StepOutcome> {
        self.calls.push((step, command.to_string_lossy().into_owned()));
        if self.unspawnable.contains(&step) {
            return Err(UpdateError::SpawnFailed {
                step,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(self
            .outcomes
            .get(&step)
            .cloned()
            .unwrap_or_else(StepOutcome::ok))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shell_runner_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let outcome = ShellRunner::new("sh")
            .run(Step::StopService, OsStr::new("exit 3"), dir.path())
            .unwrap();
        assert_eq!(outcome.code, Some(3));
        assert!(!outcome.success);
    }

    #[test]
    fn shell_runner_captures_stderr() {
        let dir = TempDir::new().unwrap();
        let outcome = ShellRunner::new("sh")
            .run(Step::InstallCandidate, OsStr::new("mv update_missing target"), dir.path())
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("update_missing"));
    }

    #[test]
    fn shell_runner_runs_in_cwd() {
        let dir = TempDir::new().unwrap();
        let outcome = ShellRunner::new("sh")
            .run(Step::MarkExecutable, OsStr::new("touch marker"), dir.path())
            .unwrap();
        assert!(outcome.success);
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn stderr_written_across_a_wait_is_captured() {
        let dir = TempDir::new().unwrap();
        let outcome = ShellRunner::new("sh")
            .run(
                Step::StopService,
                OsStr::new("echo stopping >&2; sleep 0.2; echo timed out >&2; exit 1"),
                dir.path(),
            )
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.stderr, "stopping\ntimed out\n");
    }

    #[test]
    fn stdout_can_be_redirected() {
        let dir = TempDir::new().unwrap();
        let outcome = ShellRunner::new("sh")
            .stdout_to_stderr()
            .run(Step::StartService, OsStr::new("echo started"), dir.path())
            .unwrap();
        assert!(outcome.success);
    }

    #[test]
    fn missing_shell_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let err = ShellRunner::new("/nonexistent/shell")
            .run(Step::RemoveTarget, OsStr::new("true"), dir.path())
            .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::SpawnFailed {
                step: Step::RemoveTarget,
                ..
            }
        ));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let outcome = DryRunRunner
            .run(Step::MarkExecutable, OsStr::new("touch marker"), dir.path())
            .unwrap();
        assert_eq!(outcome, StepOutcome::ok());
        assert!(!dir.path().join("marker").exists());
    }
}
