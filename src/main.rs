//! Raman QC command-line tool
//!
//! Evaluates Raman spectra against QC recipes at the edge and reports a
//! GREEN / AMBER / RED verdict per sample.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use raman_qc::config::{self, Config};

mod cli;
mod crash;

use cli::{Cli, Command};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("rqc error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    // Install crash handler first thing
    crash::install_panic_hook();

    let cli = Cli::parse();

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(config::paths::config_file);

    // Load errors surface in the command itself; logging still needs a level
    let config = Config::load_or_default(Some(config_path.as_path()));
    let level = log_level(&cli, config.as_ref().ok());

    // Batch runs log JSON to file; everything else logs to the console
    let _guard = match &cli.command {
        Command::Batch { .. } => init_file_logging(&level)?,
        _ => init_console_logging(&level)?,
    };

    info!(version = env!("CARGO_PKG_VERSION"), "rqc starting");

    match cli.command {
        Command::Evaluate {
            recipe,
            spectrum,
            json,
        } => cli::evaluate::run(&config?, &recipe, &spectrum, json),
        Command::Batch { recipe, pattern } => cli::batch::run(&config?, &recipe, &pattern),
        Command::Recipe { action } => cli::recipes::run(&config?, action),
        Command::Config { action } => cli::config::run(&config_path, action),
        Command::Version => {
            println!("rqc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `--log-level` (or `RQC_LOG_LEVEL`), then `[agent] log_level`, then info.
/// `RUST_LOG` still overrides all of them.
fn log_level(cli: &Cli, config: Option<&Config>) -> String {
    match (&cli.log_level, config) {
        (Some(level), _) => level.as_str().to_string(),
        (None, Some(config)) => config.agent.log_level.to_lowercase(),
        (None, None) => "info".to_string(),
    }
}

fn init_console_logging(level: &str) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    Ok(None)
}

fn init_file_logging(level: &str) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config::paths::log_dir()?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("rqc")
        .filename_suffix("log")
        .max_log_files(10)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    Ok(Some(guard))
}
