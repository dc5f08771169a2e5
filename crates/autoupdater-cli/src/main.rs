mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "autoupdater",
    about = "Watch a directory for new service builds and install them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory to watch for update files (default: current directory)
    #[arg(long, global = true, env = "AUTOUPDATER_DIR")]
    dir: Option<PathBuf>,

    /// Configuration file (default: <dir>/autoupdater.yaml when present)
    #[arg(long, global = true, env = "AUTOUPDATER_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for update files and install each one (runs until killed)
    Watch {
        /// Run a single iteration and exit
        #[arg(long)]
        once: bool,

        /// Seconds to sleep before each scan (overrides the config)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Stop an update at its first failing step
        #[arg(long)]
        strict: bool,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// List update candidates in the watch directory
    Scan,

    /// Install a single update file now
    Apply {
        /// Entry name inside the watch directory (e.g. update_v2)
        name: OsString,

        /// Stop at the first failing step and exit non-zero
        #[arg(long)]
        strict: bool,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show, validate, or initialize the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    // stdout carries the console contract; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dir = root::resolve_dir(cli.dir.as_deref());
    let ctx = cmd::Context {
        dir,
        config_path: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Watch {
            once,
            interval,
            strict,
            dry_run,
        } => cmd::watch::run(
            &ctx,
            cmd::watch::WatchOptions {
                once,
                interval,
                strict,
                dry_run,
            },
        ),
        Commands::Scan => cmd::scan::run(&ctx),
        Commands::Apply {
            name,
            strict,
            dry_run,
        } => cmd::apply::run(&ctx, &name, strict, dry_run),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
