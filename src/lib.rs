//! png-crusher - recompress PNG assets in place
//!
//! This library walks a source tree and runs an external lossless
//! recompressor (pngcrush) on every png file:
//! - Deterministic, depth-first traversal with per-entry error reporting
//! - Host-dependent command construction (`cmd /c` on Windows)
//! - Size comparison and keep/discard/replace policy
//! - Dry-run mode that never touches the source tree
//! - Rename-based replacement that never deletes the original first

pub mod cli;
pub mod config;
pub mod crush;
pub mod error;
pub mod launcher;
pub mod os;
pub mod process;
pub mod walker;

pub use cli::Cli;
pub use config::{Config, ConfigError, RunConfig};
pub use crush::{Crusher, Disposition, FileOutcome};
pub use error::{Error, Result};
pub use launcher::{ProcessLauncher, ToolExit, ToolLauncher};
pub use os::{CommandStyle, HostFamily, Invocation};
pub use process::{Processor, RunReport, RunStats};
pub use walker::{TreeWalker, WalkStats};
