//! Device sentry CLI - devsentry command

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sentry_cli::{config, logging, Exit, Overrides};
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

/// Device sentry - live audit trail of device attach, detach and change events
#[derive(Parser)]
#[command(name = "devsentry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch devices interactively (default)
    Watch,
    /// Print the devices currently present and exit
    List,
}

#[derive(Args)]
struct Options {
    /// Config file (default: <config dir>/devsentry/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per bus (default: /sys/bus)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Only watch this bus (repeatable)
    #[arg(long = "bus", global = true)]
    buses: Vec<String>,

    /// Rescan interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

impl Options {
    fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            buses: self.buses.clone(),
            poll_interval_ms: self.interval_ms,
            no_color: self.no_color,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.options.log_file.as_deref())?;

    let config = config::load(cli.options.config.as_deref())?
        .with_overrides(&cli.options.overrides())?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => match cmd::watch::run(config).await? {
            Exit::Quit | Exit::Cancelled => Ok(ExitCode::SUCCESS),
            Exit::Aborted => Ok(ExitCode::FAILURE),
        },
        Commands::List => {
            cmd::list::run(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
