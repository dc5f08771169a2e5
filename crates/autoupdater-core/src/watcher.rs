use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::apply::{apply_candidate, ApplyReport};
use crate::config::Config;
use crate::error::Result;
use crate::runner::CommandRunner;
use crate::scan::{scan_candidates, Candidate};
use crate::sleep::Sleeper;

pub fn progress_message(iteration: u64) -> String {
    format!("Checking for updates ({iteration})...")
}

/// Outcome of a single poll iteration.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub iteration: u64,
    pub candidates: Vec<Candidate>,
    pub applied: Vec<ApplyReport>,
}

/// Polls a directory and applies every update candidate it finds.
pub struct Watcher<R, S> {
    config: Config,
    dir: PathBuf,
    runner: R,
    sleeper: S,
    iteration: u64,
}

impl<R: CommandRunner, S: Sleeper> Watcher<R, S> {
    pub fn new(config: Config, dir: impl Into<PathBuf>, runner: R, sleeper: S) -> Self {
        Self {
            config,
            dir: dir.into(),
            runner,
            sleeper,
            iteration: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of iterations started so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Sleep, announce, scan, then apply each candidate in listing order.
    ///
    /// A failure to list the directory is returned; command failures are not.
    pub fn tick<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<TickReport> {
        self.sleeper.sleep(self.config.poll_interval());

        let iteration = self.iteration;
        writeln!(out, "{}", progress_message(iteration))?;
        self.iteration += 1;

        let candidates = scan_candidates(&self.dir, &self.config.prefix)?;
        let mut applied = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            tracing::info!(
                iteration,
                candidate = %candidate.name.to_string_lossy(),
                kind = candidate.kind.as_str(),
                "update candidate found"
            );
            let report = apply_candidate(
                &mut self.runner,
                &self.config,
                &self.dir,
                &candidate.name,
                out,
            )?;
            applied.push(report);
        }

        Ok(TickReport {
            iteration,
            candidates,
            applied,
        })
    }

    /// Poll forever. Returns only when listing the directory (or writing to
    /// `out`) fails.
    pub fn run<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        tracing::info!(
            dir = %self.dir.display(),
            prefix = %self.config.prefix,
            service = %self.config.service,
            interval_secs = self.config.poll_interval_secs,
            mode = %self.config.mode,
            "watching for updates"
        );
        loop {
            self.tick(out)?;
        }
    }
}
