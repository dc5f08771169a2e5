use serde::Serialize;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;

use crate::config::Config;
use crate::paths::{name_bytes, name_from_bytes};

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One stage of the apply sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    MarkExecutable,
    StopService,
    RemoveTarget,
    InstallCandidate,
    StartService,
}

impl Step {
    pub fn all() -> &'static [Step] {
        &[
            Step::MarkExecutable,
            Step::StopService,
            Step::RemoveTarget,
            Step::InstallCandidate,
            Step::StartService,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::MarkExecutable => "mark_executable",
            Step::StopService => "stop_service",
            Step::RemoveTarget => "remove_target",
            Step::InstallCandidate => "install_candidate",
            Step::StartService => "start_service",
        }
    }

    /// Steps that talk to the service manager rather than the filesystem.
    pub fn is_service_step(self) -> bool {
        matches!(self, Step::StopService | Step::StartService)
    }

    /// Render the shell command line for this step. The candidate name is
    /// kept byte for byte, so the line is an `OsString`.
    pub fn command(self, candidate: &OsStr, config: &Config) -> OsString {
        let candidate = shell_quote(&name_bytes(candidate)).into_owned();
        let target = shell_quote(config.install_path.as_bytes()).into_owned();
        let service = shell_quote(config.service.as_bytes()).into_owned();
        let manager = config.service_manager.as_bytes();
        let line = match self {
            Step::MarkExecutable => [b"chmod +x ".as_slice(), candidate.as_slice()].concat(),
            Step::StopService => [manager, b" stop ".as_slice(), service.as_slice()].concat(),
            Step::RemoveTarget => [b"rm -rf ".as_slice(), target.as_slice()].concat(),
            Step::InstallCandidate => [
                b"mv ".as_slice(),
                candidate.as_slice(),
                b" ".as_slice(),
                target.as_slice(),
            ]
            .concat(),
            Step::StartService => [manager, b" start ".as_slice(), service.as_slice()].concat(),
        };
        name_from_bytes(line)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ApplyPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub command: OsString,
}

/// The fully rendered apply sequence for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    pub candidate: OsString,
    pub steps: Vec<PlannedStep>,
}

impl ApplyPlan {
    pub fn new(candidate: &OsStr, config: &Config) -> Self {
        let steps = Step::all()
            .iter()
            .map(|&step| PlannedStep {
                step,
                command: step.command(candidate, config),
            })
            .collect();
        Self {
            candidate: candidate.to_os_string(),
            steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

/// Quote `arg` for `sh` only when it contains bytes outside the portable
/// safe set; plain names pass through untouched.
pub fn shell_quote(arg: &[u8]) -> Cow<'_, [u8]> {
    let safe = !arg.is_empty()
        && arg
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"_./@%+=:,-".contains(b));
    if safe {
        return Cow::Borrowed(arg);
    }
    let mut quoted = Vec::with_capacity(arg.len() + 2);
    quoted.push(b'\'');
    for &b in arg {
        if b == b'\'' {
            quoted.extend_from_slice(br"'\''");
        } else {
            quoted.push(b);
        }
    }
    quoted.push(b'\'');
    Cow::Owned(quoted)
}
