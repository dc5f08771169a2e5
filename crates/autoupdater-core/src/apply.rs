use serde::Serialize;
use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;

use crate::config::{Config, Mode};
use crate::error::{ErrorKind, Result, UpdateError};
use crate::paths::name_bytes;
use crate::runner::CommandRunner;
use crate::step::{ApplyPlan, Step};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub command: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Why a strict apply stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    /// `None` when the sequence was refused before any step ran.
    pub step: Option<Step>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ApplyFailure {
    fn new(step: Option<Step>, err: &UpdateError) -> Self {
        Self {
            step,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Lossy rendering when the entry name is not UTF-8.
    pub candidate: String,
    pub mode: Mode,
    pub steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ApplyFailure>,
}

impl ApplyReport {
    /// All five steps ran and each exited successfully.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && self.steps.len() == Step::all().len()
            && self.steps.iter().all(|s| s.success)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.success)
    }
}

// ---------------------------------------------------------------------------
// apply_candidate
// ---------------------------------------------------------------------------

/// Run the apply sequence for the entry `candidate` inside `dir`.
///
/// `Running command: <line>` is written to `out` before every step. In
/// [`Mode::Faithful`] all five steps run whatever their outcome; in
/// [`Mode::Strict`] the candidate and service manager are checked first and
/// the sequence stops at the first failing step, recording an
/// [`ApplyFailure`].
///
/// Step failures never surface as `Err`; only a failed write to `out` does.
pub fn apply_candidate<R, W>(
    runner: &mut R,
    config: &Config,
    dir: &Path,
    candidate: impl AsRef<OsStr>,
    out: &mut W,
) -> Result<ApplyReport>
where
    R: CommandRunner + ?Sized,
    W: Write + ?Sized,
{
    let candidate = candidate.as_ref();
    let label = candidate.to_string_lossy();
    let plan = ApplyPlan::new(candidate, config);
    let mode = config.mode;
    let mut report = ApplyReport {
        candidate: label.to_string(),
        mode,
        steps: Vec::with_capacity(plan.steps.len()),
        failure: None,
    };

    tracing::info!(candidate = %label, %mode, "applying update");

    if mode == Mode::Strict {
        if let Err(e) = preflight(config, dir, candidate) {
            tracing::warn!(candidate = %label, error = %e, "update refused");
            report.failure = Some(ApplyFailure::new(None, &e));
            return Ok(report);
        }
    }

    for planned in plan.steps {
        out.write_all(b"Running command: ")?;
        out.write_all(&name_bytes(&planned.command))?;
        out.write_all(b"\n")?;

        let command = planned.command.to_string_lossy().into_owned();
        let error = match runner.run(planned.step, &planned.command, dir) {
            Ok(outcome) => {
                tracing::debug!(
                    step = %planned.step,
                    code = ?outcome.code,
                    success = outcome.success,
                    "step finished"
                );
                let error = (!outcome.success).then(|| UpdateError::StepFailed {
                    step: planned.step,
                    code: outcome.code,
                    stderr: outcome.stderr,
                });
                report.steps.push(StepReport {
                    step: planned.step,
                    command,
                    exit_code: outcome.code,
                    success: outcome.success,
                });
                error
            }
            Err(e) => {
                report.steps.push(StepReport {
                    step: planned.step,
                    command,
                    exit_code: None,
                    success: false,
                });
                Some(e)
            }
        };

        let Some(e) = error else { continue };
        match mode {
            Mode::Faithful => {
                tracing::warn!(candidate = %label, step = %planned.step, error = %e, "step failed, continuing");
            }
            Mode::Strict => {
                tracing::warn!(candidate = %label, step = %planned.step, error = %e, "step failed, aborting");
                report.failure = Some(ApplyFailure::new(Some(planned.step), &e));
                break;
            }
        }
    }

    if report.is_success() {
        tracing::info!(candidate = %label, "update applied");
    }
    Ok(report)
}

fn preflight(config: &Config, dir: &Path, candidate: &OsStr) -> Result<()> {
    let path = dir.join(candidate);
    if std::fs::symlink_metadata(&path).is_err() {
        return Err(UpdateError::CandidateNotFound(path));
    }
    if which::which(&config.service_manager).is_err() {
        return Err(UpdateError::ServiceManagerUnavailable(
            config.service_manager.clone(),
        ));
    }
    Ok(())
}
