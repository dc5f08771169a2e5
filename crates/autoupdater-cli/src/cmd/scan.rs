use crate::cmd::Context;
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use autoupdater_core::scan::scan_candidates;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let candidates = scan_candidates(&ctx.dir, &config.prefix)
        .with_context(|| format!("failed to scan {}", ctx.dir.display()))?;

    if ctx.json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!(
            "No update candidates matching '{}' in {}.",
            config.prefix,
            ctx.dir.display()
        );
        return Ok(());
    }

    // Rows stay in listing order, the order `watch` applies them in.
    let rows: Vec<Vec<String>> = candidates
        .iter()
        .map(|c| {
            vec![
                c.name.to_string_lossy().into_owned(),
                c.kind.as_str().to_string(),
                c.modified
                    .map(|m| m.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["NAME", "KIND", "MODIFIED"], &rows);
    Ok(())
}
