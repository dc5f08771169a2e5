use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::step::Step;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid service name '{0}': must be a valid systemd unit name")]
    InvalidServiceName(String),

    #[error("update candidate not found: {}", .0.display())]
    CandidateNotFound(PathBuf),

    #[error("service manager unavailable: '{0}' not found on PATH")]
    ServiceManagerUnavailable(String),

    #[error("failed to spawn '{step}': {source}")]
    SpawnFailed {
        step: Step,
        source: std::io::Error,
    },

    #[error("step '{step}' failed ({}){}", exit_label(.code), stderr_suffix(.stderr))]
    StepFailed {
        step: Step,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, UpdateError>;

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification of a failed apply sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Permission,
    NotFound,
    ServiceManagerUnavailable,
    Other,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ServiceManagerUnavailable => "service_manager_unavailable",
            ErrorKind::Other => "other",
        }
    }

    fn from_io(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::ConfigNotFound(_) | UpdateError::CandidateNotFound(_) => {
                ErrorKind::NotFound
            }
            UpdateError::ServiceManagerUnavailable(_) => ErrorKind::ServiceManagerUnavailable,
            UpdateError::SpawnFailed { step, source } => {
                if step.is_service_step() && source.kind() == std::io::ErrorKind::NotFound {
                    ErrorKind::ServiceManagerUnavailable
                } else {
                    ErrorKind::from_io(source.kind())
                }
            }
            UpdateError::StepFailed { step, code, stderr } => classify_stderr(*step, *code, stderr),
            UpdateError::Io(e) => ErrorKind::from_io(e.kind()),
            _ => ErrorKind::Other,
        }
    }
}

fn classify_stderr(step: Step, code: Option<i32>, stderr: &str) -> ErrorKind {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("access denied")
        || lower.contains("authentication is required")
    {
        return ErrorKind::Permission;
    }
    if step.is_service_step()
        && (code == Some(127)
            || lower.contains("failed to connect to bus")
            || lower.contains("not been booted with systemd")
            || lower.contains("command not found"))
    {
        return ErrorKind::ServiceManagerUnavailable;
    }
    if lower.contains("no such file or directory") || lower.contains("cannot stat") {
        return ErrorKind::NotFound;
    }
    ErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_failed(step: Step, code: Option<i32>, stderr: &str) -> UpdateError {
        UpdateError::StepFailed {
            step,
            code,
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn chmod_permission_denied_is_permission() {
        let err = step_failed(
            Step::MarkExecutable,
            Some(1),
            "chmod: changing permissions of 'update_v2': Operation not permitted",
        );
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn mv_missing_source_is_not_found() {
        let err = step_failed(
            Step::InstallCandidate,
            Some(1),
            "mv: cannot stat 'update_v2': No such file or directory",
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn systemctl_without_bus_is_service_manager_unavailable() {
        let err = step_failed(
            Step::StopService,
            Some(1),
            "System has not been booted with systemd as init system (PID 1). Can't operate.\nFailed to connect to bus: Host is down",
        );
        assert_eq!(err.kind(), ErrorKind::ServiceManagerUnavailable);
    }

    #[test]
    fn missing_systemctl_binary_is_service_manager_unavailable() {
        let err = step_failed(Step::StartService, Some(127), "sh: 1: systemctl: not found");
        assert_eq!(err.kind(), ErrorKind::ServiceManagerUnavailable);
    }

    #[test]
    fn exit_127_on_file_step_is_not_service_manager() {
        let err = step_failed(Step::RemoveTarget, Some(127), "sh: 1: rm: not found");
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn step_failed_message_includes_exit_code_and_stderr() {
        let err = step_failed(Step::StopService, Some(5), "Unit web-portal.service not loaded.\n");
        assert_eq!(
            err.to_string(),
            "step 'stop_service' failed (exit code 5): Unit web-portal.service not loaded."
        );
    }

    #[test]
    fn step_failed_message_without_stderr() {
        let err = step_failed(Step::MarkExecutable, None, "");
        assert_eq!(
            err.to_string(),
            "step 'mark_executable' failed (terminated by signal)"
        );
    }

    #[test]
    fn candidate_not_found_kind() {
        let err = UpdateError::CandidateNotFound(PathBuf::from("update_gone"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().to_string(), "not_found");
    }
}
