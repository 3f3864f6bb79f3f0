//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// png-crusher - recompress PNG assets in place with pngcrush
///
/// Walks a source directory, runs pngcrush on every png file and keeps the
/// crushed version only when it is smaller. Runs as a dry run unless
/// `--apply` is given.
#[derive(Parser, Debug)]
#[command(name = "png-crusher")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Directory to scan for png files
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Path to the pngcrush executable
    #[arg(short, long, env = "PNGCRUSH")]
    pub tool: Option<String>,

    /// Replace files whose crushed version is smaller
    #[arg(long, conflicts_with = "dry_run")]
    pub apply: bool,

    /// Only report possible savings (default)
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Case-sensitive file-name suffix of files to crush
    #[arg(long)]
    pub extension: Option<String>,

    /// Directory pngcrush writes its output to
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Keep pngcrush output even when it exits with a non-zero status
    #[arg(long)]
    pub accept_nonzero_exit: bool,

    /// Write a JSON report of all outcomes to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print a commented sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log file format as JSON
    #[arg(long, requires = "log_file")]
    pub json_log: bool,

    /// Extra pngcrush arguments, given after `--`
    #[arg(last = true, allow_hyphen_values = true)]
    pub arguments: Vec<String>,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_directory = Some(source.clone());
        }
        if let Some(ref tool) = self.tool {
            config.path_to_pngcrush = tool.clone();
        }
        if self.apply {
            config.dry_run = false;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(ref extension) = self.extension {
            config.extension = extension.clone();
        }
        if let Some(ref temp_dir) = self.temp_dir {
            config.temp_directory = Some(temp_dir.clone());
        }
        if self.accept_nonzero_exit {
            config.accept_nonzero_exit = true;
        }
        if !self.arguments.is_empty() {
            config.arguments = self.arguments.clone();
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
