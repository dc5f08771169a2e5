use crate::cmd::Context;
use crate::output::print_json;
use autoupdater_core::apply::apply_candidate;
use autoupdater_core::config::Mode;
use autoupdater_core::runner::{DryRunRunner, ShellRunner};
use std::ffi::OsStr;
use std::io::Write;

pub fn run(ctx: &Context, name: &OsStr, strict: bool, dry_run: bool) -> anyhow::Result<()> {
    let mut config = ctx.load_checked_config()?;
    if strict {
        config.mode = Mode::Strict;
    }

    // With --json the progress lines move to stderr so stdout stays parseable.
    let mut out: Box<dyn Write> = if ctx.json {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };

    let report = if dry_run {
        apply_candidate(&mut DryRunRunner, &config, &ctx.dir, name, &mut *out)?
    } else {
        let mut runner = ShellRunner::new(config.shell.clone());
        if ctx.json {
            runner = runner.stdout_to_stderr();
        }
        apply_candidate(&mut runner, &config, &ctx.dir, name, &mut *out)?
    };
    out.flush()?;

    if ctx.json {
        print_json(&report)?;
    }

    if let Some(failure) = &report.failure {
        anyhow::bail!(
            "update '{}' aborted [{}]: {}",
            report.candidate,
            failure.kind,
            failure.message
        );
    }

    let failed = report.failed_steps().count();
    if failed > 0 {
        tracing::warn!(
            "{failed} of {} steps failed for '{}'",
            report.steps.len(),
            report.candidate
        );
    }
    Ok(())
}
