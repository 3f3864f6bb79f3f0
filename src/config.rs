//! Configuration types for the png crusher

use crate::error::{Error, Result};
use crate::os::{CommandStyle, HostFamily};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file-name suffix of crushed files
pub const DEFAULT_EXTENSION: &str = ".png";

/// Default name of the recompression executable
pub const DEFAULT_TOOL: &str = "pngcrush";

/// Configuration as written in a TOML file or assembled from the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory that is checked for png files
    pub source_directory: Option<PathBuf>,

    /// Only report possible savings, never rewrite files
    pub dry_run: bool,

    /// Path to (or name of) the pngcrush executable
    pub path_to_pngcrush: String,

    /// Extra arguments passed to pngcrush before the source and target paths
    pub arguments: Vec<String>,

    /// Case-sensitive suffix a file name must end with to be crushed
    pub extension: String,

    /// Where pngcrush writes its output (host temp directory when unset)
    pub temp_directory: Option<PathBuf>,

    /// Treat a non-zero pngcrush exit as success when it still wrote output
    pub accept_nonzero_exit: bool,

    /// Force (`true`) or disable (`false`) the `cmd /c` wrapper
    pub shell_wrap: Option<bool>,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_directory: None,
            dry_run: true,
            path_to_pngcrush: DEFAULT_TOOL.to_string(),
            arguments: vec![],
            extension: DEFAULT_EXTENSION.to_string(),
            temp_directory: None,
            accept_nonzero_exit: false,
            shell_wrap: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Resolve ambient values (host family, temp directory, absolute root)
    /// once and freeze them into a [`RunConfig`].
    pub fn resolve(&self) -> Result<RunConfig> {
        self.resolve_for_host(HostFamily::current(), std::env::temp_dir())
    }

    /// Like [`Config::resolve`] with the host facts supplied by the caller.
    pub fn resolve_for_host(&self, host: HostFamily, host_temp: PathBuf) -> Result<RunConfig> {
        let source = self
            .source_directory
            .as_ref()
            .ok_or_else(|| Error::Config("source_directory is required".into()))?;

        if self.path_to_pngcrush.trim().is_empty() {
            return Err(Error::Config("path_to_pngcrush must not be empty".into()));
        }
        if self.extension.is_empty() {
            return Err(Error::Config("extension must not be empty".into()));
        }

        let command_style = match self.shell_wrap {
            Some(true) => CommandStyle::ShellWrapped,
            Some(false) => CommandStyle::Direct,
            None => CommandStyle::for_host(host),
        };

        Ok(RunConfig {
            source_root: std::path::absolute(source)?,
            dry_run: self.dry_run,
            tool_path: self.path_to_pngcrush.clone(),
            extra_args: self.arguments.clone(),
            extension: self.extension.clone(),
            temp_dir: self.temp_directory.clone().unwrap_or(host_temp),
            command_style,
            accept_nonzero_exit: self.accept_nonzero_exit,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# png-crusher configuration file
# This file uses TOML format (https://toml.io)

# Directory that is scanned (recursively) for png files
source_directory = "src/main/resources"

# Dry run: only report what pngcrush could save, never rewrite files.
# Set to false to replace files whose crushed version is smaller.
dry_run = true

# Path to the pngcrush executable (a bare name is looked up in PATH)
path_to_pngcrush = "pngcrush"

# Extra pngcrush arguments, inserted before the source and target paths
arguments = ["-brute", "-rem", "alla"]

# Case-sensitive file-name suffix of files to crush
extension = ".png"

# Directory pngcrush writes its output to (defaults to the system temp dir)
# temp_directory = "/tmp"

# Trust pngcrush output even when it exits with a non-zero status
accept_nonzero_exit = false

# Force (true) or disable (false) running pngcrush through `cmd /c`.
# Defaults to true on Windows and false elsewhere.
# shell_wrap = false

# Verbose output
verbose = false
"#
        .to_string()
    }
}

/// Immutable settings of one crushing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Absolute directory that is walked
    pub source_root: PathBuf,
    pub dry_run: bool,
    pub tool_path: String,
    pub extra_args: Vec<String>,
    pub extension: String,
    /// Directory the tool writes its candidate output to
    pub temp_dir: PathBuf,
    pub command_style: CommandStyle,
    pub accept_nonzero_exit: bool,
}

impl RunConfig {
    /// A run over `source_root` with default settings for the current host
    pub fn new(source_root: impl Into<PathBuf>, tool_path: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
            dry_run: true,
            tool_path: tool_path.into(),
            extra_args: vec![],
            extension: DEFAULT_EXTENSION.to_string(),
            temp_dir: std::env::temp_dir(),
            command_style: CommandStyle::for_host(HostFamily::current()),
            accept_nonzero_exit: false,
        }
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.dry_run);
        assert_eq!(config.path_to_pngcrush, "pngcrush");
        assert_eq!(config.extension, ".png");
        assert!(config.arguments.is_empty());
        assert!(!config.accept_nonzero_exit);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(
            config.source_directory,
            Some(PathBuf::from("src/main/resources"))
        );
        assert!(config.dry_run);
        assert_eq!(config.arguments, vec!["-brute", "-rem", "alla"]);
        assert_eq!(config.shell_wrap, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(r#"source_directory = "assets""#).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.path_to_pngcrush, "pngcrush");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crush.toml");
        fs::write(
            &path,
            "source_directory = \"/srv/assets\"\ndry_run = false\narguments = [\"-q\"]\n",
        )
        .unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.source_directory, Some(PathBuf::from("/srv/assets")));
        assert!(!loaded.dry_run);
        assert_eq!(loaded.arguments, vec!["-q"]);
        assert_eq!(loaded.path_to_pngcrush, "pngcrush");
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().starts_with("Failed to read config file '"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "dry_run = maybe").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_resolve_requires_source() {
        let err = Config::default().resolve().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_for_host() {
        let config = Config {
            source_directory: Some(PathBuf::from("/srv/assets")),
            ..Config::default()
        };

        let windows = config
            .resolve_for_host(HostFamily::Windows, PathBuf::from("C:/Temp"))
            .unwrap();
        assert_eq!(windows.command_style, CommandStyle::ShellWrapped);
        assert_eq!(windows.temp_dir, PathBuf::from("C:/Temp"));
        assert!(windows.dry_run);

        let unix = config
            .resolve_for_host(HostFamily::Unix, PathBuf::from("/tmp"))
            .unwrap();
        assert_eq!(unix.command_style, CommandStyle::Direct);
    }

    #[test]
    fn test_resolve_overrides() {
        let config = Config {
            source_directory: Some(PathBuf::from("assets")),
            temp_directory: Some(PathBuf::from("/scratch")),
            shell_wrap: Some(false),
            ..Config::default()
        };
        let run = config
            .resolve_for_host(HostFamily::Windows, PathBuf::from("C:/Temp"))
            .unwrap();
        assert_eq!(run.command_style, CommandStyle::Direct);
        assert_eq!(run.temp_dir, PathBuf::from("/scratch"));
        assert!(run.source_root.is_absolute());
    }
}
