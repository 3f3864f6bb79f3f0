//! Error types for the png crusher

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for png crusher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the png crusher
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source directory {path} does not exist or is not a directory")]
    RootNotFound { path: PathBuf },

    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {}", describe_exit(.code))]
    ToolFailed { tool: String, code: Option<i32> },

    #[error("Tool produced no output at {path}")]
    NoOutput { path: PathBuf },

    #[error("Failed to install optimized file over {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
