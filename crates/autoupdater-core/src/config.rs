use crate::error::{Result, UpdateError};
use crate::paths::{self, resolve_install_path};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How the apply sequence treats a failing step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Run every step regardless of the previous step's exit status.
    #[default]
    Faithful,
    /// Stop at the first failing step.
    Strict,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Faithful => "faithful",
            Mode::Strict => "strict",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Entries whose name starts with this prefix are treated as new builds.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_service_manager")]
    pub service_manager: String,
    /// Where the new build is moved to; relative paths resolve against the
    /// watch directory.
    #[serde(default = "default_install_path")]
    pub install_path: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_prefix() -> String {
    paths::DEFAULT_PREFIX.to_string()
}

fn default_service() -> String {
    paths::DEFAULT_SERVICE.to_string()
}

fn default_service_manager() -> String {
    paths::DEFAULT_SERVICE_MANAGER.to_string()
}

fn default_install_path() -> String {
    paths::DEFAULT_INSTALL_PATH.to_string()
}

fn default_poll_interval_secs() -> u64 {
    paths::DEFAULT_POLL_INTERVAL_SECS
}

fn default_shell() -> String {
    paths::DEFAULT_SHELL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            service: default_service(),
            service_manager: default_service_manager(),
            install_path: default_install_path(),
            poll_interval_secs: default_poll_interval_secs(),
            mode: Mode::default(),
            shell: default_shell(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UpdateError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        // An empty file means "all defaults".
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `explicit` if given, otherwise `<dir>/autoupdater.yaml` when it
    /// exists, otherwise the built-in defaults.
    pub fn load_or_default(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = paths::config_path(dir);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, dir: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.prefix.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "prefix is empty; every directory entry would be installed".to_string(),
            });
        }

        if let Err(e) = paths::validate_service_name(&self.service) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if self.install_path.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "install_path is empty".to_string(),
            });
        } else {
            let target = resolve_install_path(dir, &self.install_path);
            let parent_missing = target.parent().map(|p| !p.is_dir()).unwrap_or(true);
            if parent_missing {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "install directory for '{}' does not exist",
                        self.install_path
                    ),
                });
            }
        }

        if self.poll_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "poll_interval_secs is 0; the watcher will scan continuously"
                    .to_string(),
            });
        }

        if which::which(&self.shell).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("shell '{}' not found on PATH", self.shell),
            });
        }

        if which::which(&self.service_manager).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "service manager '{}' not found on PATH",
                    self.service_manager
                ),
            });
        }

        warnings
    }
}

pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
    warnings.iter().any(|w| w.level == WarnLevel::Error)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
