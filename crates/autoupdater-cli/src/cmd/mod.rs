pub mod apply;
pub mod config;
pub mod scan;
pub mod watch;

use anyhow::Context as _;
use autoupdater_core::config::{has_errors, Config, WarnLevel};
use std::path::PathBuf;

/// Global options shared by every subcommand.
pub struct Context {
    pub dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        Config::load_or_default(&self.dir, self.config_path.as_deref())
            .context("failed to load config")
    }

    /// Load the config and refuse to go on if it has error-level problems.
    /// Warnings are logged and otherwise ignored.
    pub fn load_checked_config(&self) -> anyhow::Result<Config> {
        let config = self.load_config()?;
        let warnings = config.validate(&self.dir);
        for w in &warnings {
            match w.level {
                WarnLevel::Warning => tracing::warn!("config: {}", w.message),
                WarnLevel::Error => tracing::error!("config: {}", w.message),
            }
        }
        if has_errors(&warnings) {
            let messages: Vec<&str> = warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .map(|w| w.message.as_str())
                .collect();
            anyhow::bail!("invalid config: {}", messages.join("; "));
        }
        Ok(config)
    }
}
