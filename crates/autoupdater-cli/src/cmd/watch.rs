use crate::cmd::Context;
use anyhow::Context as _;
use autoupdater_core::config::Mode;
use autoupdater_core::runner::{CommandRunner, DryRunRunner, ShellRunner};
use autoupdater_core::sleep::{Sleeper, ThreadSleeper};
use autoupdater_core::watcher::Watcher;

pub struct WatchOptions {
    pub once: bool,
    pub interval: Option<u64>,
    pub strict: bool,
    pub dry_run: bool,
}

pub fn run(ctx: &Context, opts: WatchOptions) -> anyhow::Result<()> {
    let mut config = ctx.load_checked_config()?;
    if let Some(secs) = opts.interval {
        config.poll_interval_secs = secs;
    }
    if opts.strict {
        config.mode = Mode::Strict;
    }

    if opts.dry_run {
        drive(
            Watcher::new(config, &ctx.dir, DryRunRunner, ThreadSleeper),
            opts.once,
        )
    } else {
        let runner = ShellRunner::new(config.shell.clone());
        drive(
            Watcher::new(config, &ctx.dir, runner, ThreadSleeper),
            opts.once,
        )
    }
}

fn drive<R: CommandRunner, S: Sleeper>(
    mut watcher: Watcher<R, S>,
    once: bool,
) -> anyhow::Result<()> {
    let dir = watcher.dir().display().to_string();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if once {
        let report = watcher
            .tick(&mut out)
            .with_context(|| format!("failed to scan {dir}"))?;
        tracing::info!(
            candidates = report.candidates.len(),
            applied = report.applied.iter().filter(|r| r.is_success()).count(),
            "single iteration finished"
        );
        return Ok(());
    }

    watcher
        .run(&mut out)
        .with_context(|| format!("watcher stopped: failed to scan {dir}"))
}
