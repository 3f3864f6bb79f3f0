//! png-crusher - recompress PNG assets in place with pngcrush
//!
//! Command-line front end: parses arguments, merges them with an optional
//! configuration file, sets up logging and runs the processor.

use anyhow::{Context, Result};
use clap::Parser;
use png_crusher::{Cli, Config, Error, Processor, RunReport};
use std::path::Path;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the command line.

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let _ = stdout().execute(Print(style(title).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a `key: value` pair
    pub fn print_key_value(key: &str, value: &str, value_color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(value_color).bold()));
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "png-crusher failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let _guard = setup_logging(&cli, config.verbose)?;

    info!(version = env!("CARGO_PKG_VERSION"), "png-crusher starting");
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    let run_config = config.resolve().context("Invalid configuration")?;
    let processor = Processor::new(run_config);

    match processor.run() {
        Ok(report) => {
            if let Some(ref path) = cli.report {
                report
                    .save_json(path)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                info!(report = %path.display(), "Report written");
            }
            print_summary(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ Error::RootNotFound { .. }) | Err(e @ Error::WalkDir(_)) => {
            cli_output::print_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source_directory.is_none() {
        anyhow::bail!("No source directory given (use --source or a config file)");
    }

    Ok(config)
}

/// Setup logging: console always, file when `--log-file` is given
fn setup_logging(cli: &Cli, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let subscriber = tracing_subscriber::registry().with(env_filter).with(console);

    let Some(ref log_path) = cli.log_file else {
        subscriber.init();
        return Ok(None);
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(open_log_file(log_path)?);

    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(Some(guard))
}

fn open_log_file(log_path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    Ok(file)
}

fn print_summary(report: &RunReport) {
    use cli_output::*;

    let stats = &report.stats;

    print_separator();
    print_title("Crushing complete");
    print_separator();

    print_key_value("Files", &stats.total.to_string(), CliTheme::ACCENT);
    print_key_value("Already optimal", &stats.already_optimal.to_string(), CliTheme::SUCCESS);
    if report.dry_run {
        print_key_value("Can be optimized", &stats.can_be_optimized.to_string(), CliTheme::WARNING);
        print_key_value("Possible savings", &format!("{} bytes", stats.potential_savings), CliTheme::WARNING);
    } else {
        print_key_value("Optimized", &stats.optimized.to_string(), CliTheme::SUCCESS);
        print_key_value("Saved", &format!("{} bytes", stats.bytes_saved), CliTheme::SUCCESS);
    }
    print_key_value("Failed", &stats.failed.to_string(), CliTheme::ERROR);
    if stats.walk_errors > 0 {
        print_key_value("Unreadable entries", &stats.walk_errors.to_string(), CliTheme::ERROR);
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        print_separator();
        print_error(&format!("{} file(s) failed", failures.len()));
        for outcome in failures {
            print_key_value(
                &outcome.relative_path,
                outcome.error.as_deref().unwrap_or("unknown error"),
                CliTheme::ERROR,
            );
        }
    }

    if report.dry_run {
        print_separator();
        print_warning("Dry run: no files were modified (use --apply to replace them)");
    }
}
