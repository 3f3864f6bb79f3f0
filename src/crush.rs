//! Per-file crushing: run the tool, compare sizes, keep or replace.

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::launcher::ToolLauncher;
use crate::walker::relative_display;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, error, span, warn};

/// Categorical result of crushing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The tool could not make the file smaller
    AlreadyOptimal,
    /// Dry run: the file would shrink
    CanBeOptimized,
    /// The file was replaced with its smaller version
    Optimized,
    Failed,
}

impl Disposition {
    /// Suffix appended to the size line
    pub fn suffix(&self) -> &'static str {
        match self {
            Disposition::AlreadyOptimal => "OK ",
            Disposition::CanBeOptimized => "can be optimized !!!",
            Disposition::Optimized => "was optimized !!!",
            Disposition::Failed => "",
        }
    }
}

/// Result of crushing a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Path relative to the source root, `/`-separated
    pub relative_path: String,
    pub original_size: u64,
    /// Size of the tool output, absent when there was none
    pub new_size: Option<u64>,
    pub disposition: Disposition,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl FileOutcome {
    fn sized(relative_path: String, original_size: u64, new_size: u64, disposition: Disposition) -> Self {
        Self {
            relative_path,
            original_size,
            new_size: Some(new_size),
            disposition,
            error: None,
        }
    }

    fn failed(relative_path: String, original_size: u64, new_size: Option<u64>, err: &Error) -> Self {
        Self {
            relative_path,
            original_size,
            new_size,
            disposition: Disposition::Failed,
            error: Some(err.to_string()),
        }
    }

    /// `100 * new / original`; a zero-byte original counts as 100%
    pub fn ratio_percent(&self) -> Option<f64> {
        let new_size = self.new_size?;
        if self.original_size == 0 {
            return Some(100.0);
        }
        Some(100.0 * new_size as f64 / self.original_size as f64)
    }

    /// Bytes removed from disk by this outcome
    pub fn bytes_saved(&self) -> u64 {
        match (self.disposition, self.new_size) {
            (Disposition::Optimized, Some(new_size)) => self.original_size.saturating_sub(new_size),
            _ => 0,
        }
    }

    /// Bytes that applying the candidate would save
    pub fn potential_savings(&self) -> u64 {
        match (self.disposition, self.new_size) {
            (Disposition::Optimized | Disposition::CanBeOptimized, Some(new_size)) => {
                self.original_size.saturating_sub(new_size)
            }
            _ => 0,
        }
    }
}

/// Renders `"<old> => <new>, <pct>%  => <suffix>"`, or the failure reason
impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.disposition, self.new_size, self.ratio_percent()) {
            (Disposition::Failed, _, _) | (_, None, _) | (_, _, None) => write!(
                f,
                "failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
            (disposition, Some(new_size), Some(ratio)) => write!(
                f,
                "{} => {}, {}%  => {}",
                self.original_size,
                new_size,
                format_percent(ratio),
                disposition.suffix()
            ),
        }
    }
}

/// At most two decimals, trailing zeros dropped (`60`, `33.33`, `12.5`)
pub fn format_percent(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// Decides the fate of one file at a time
pub struct Crusher<L> {
    config: RunConfig,
    launcher: L,
}

impl<L: ToolLauncher> Crusher<L> {
    pub fn new(config: RunConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Where the tool writes its candidate for `source`.
    ///
    /// Normally `temp_dir/<base name>`. When the source itself lives in the
    /// temp directory that path is the source, so `.crush-tmp` is appended.
    pub fn temp_path(&self, source: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| Error::Config(format!("{} has no file name", source.display())))?;

        let source_dir = source.parent().unwrap_or(Path::new("."));
        if same_directory(&self.config.temp_dir, source_dir) {
            let mut name = name.to_os_string();
            name.push(TEMP_SUFFIX);
            return Ok(self.config.temp_dir.join(name));
        }

        Ok(self.config.temp_dir.join(name))
    }

    /// Crush one file. Never fails: problems become a `Failed` outcome.
    pub fn crush(&self, source: &Path) -> FileOutcome {
        let relative_path = relative_display(&self.config.source_root, source);
        let _file_span = span!(Level::DEBUG, "crush_file", file = %relative_path).entered();

        remove_stale_staging(source);

        let original_size = match fs::metadata(source) {
            Ok(meta) => meta.len(),
            Err(e) => {
                let err = Error::Io(e);
                warn!(file = %relative_path, error = %err, "Cannot read source file");
                return FileOutcome::failed(relative_path, 0, None, &err);
            }
        };

        if original_size == 0 {
            debug!(file = %relative_path, "Zero-byte file, nothing to crush");
            return FileOutcome::sized(relative_path, 0, 0, Disposition::AlreadyOptimal);
        }

        let temp = match self.temp_path(source) {
            Ok(p) => p,
            Err(e) => return FileOutcome::failed(relative_path, original_size, None, &e),
        };

        if let Err(e) = self.run_tool(source, &temp) {
            warn!(file = %relative_path, error = %e, "Crushing failed");
            remove_quietly(&temp);
            return FileOutcome::failed(relative_path, original_size, None, &e);
        }

        let new_size = match fs::metadata(&temp) {
            Ok(meta) => meta.len(),
            Err(_) => {
                let err = Error::NoOutput { path: temp };
                warn!(file = %relative_path, error = %err, "Crushing failed");
                return FileOutcome::failed(relative_path, original_size, None, &err);
            }
        };

        if new_size >= original_size {
            remove_quietly(&temp);
            return FileOutcome::sized(relative_path, original_size, new_size, Disposition::AlreadyOptimal);
        }

        if self.config.dry_run {
            remove_quietly(&temp);
            return FileOutcome::sized(relative_path, original_size, new_size, Disposition::CanBeOptimized);
        }

        match replace_file(&temp, source) {
            Ok(()) => FileOutcome::sized(relative_path, original_size, new_size, Disposition::Optimized),
            Err(e) => {
                error!(
                    file = %relative_path,
                    candidate = ?temp,
                    error = %e,
                    "Could not install crushed file; original left in place"
                );
                remove_quietly(&temp);
                FileOutcome::failed(relative_path, original_size, Some(new_size), &e)
            }
        }
    }

    fn run_tool(&self, source: &Path, temp: &Path) -> Result<()> {
        remove_quietly(temp);

        let invocation =
            self.config
                .command_style
                .build(&self.config.tool_path, &self.config.extra_args, source, temp);
        debug!(command = %invocation, "Running tool");

        let exit = self
            .launcher
            .launch(&invocation)
            .map_err(|e| Error::ToolLaunch {
                tool: self.config.tool_path.clone(),
                source: e,
            })?;

        if !exit.success {
            if self.config.accept_nonzero_exit {
                debug!(code = ?exit.code, "Ignoring non-zero tool exit");
            } else {
                return Err(Error::ToolFailed {
                    tool: self.config.tool_path.clone(),
                    code: exit.code,
                });
            }
        }

        Ok(())
    }
}

/// Appended to the candidate name when the source sits in the temp directory
const TEMP_SUFFIX: &str = ".crush-tmp";

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Staging file used to swap a crushed file in across filesystems
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".crush-part");
    target.with_file_name(name)
}

/// Install `candidate` at `target` without ever deleting `target` first.
///
/// A plain rename is atomic when both live on one filesystem. Otherwise the
/// candidate is copied next to the target and that copy is renamed over it.
pub fn replace_file(candidate: &Path, target: &Path) -> Result<()> {
    if fs::rename(candidate, target).is_ok() {
        return Ok(());
    }
    replace_via_staging(candidate, target)
}

/// Copy `candidate` beside `target`, then rename the copy over `target`
fn replace_via_staging(candidate: &Path, target: &Path) -> Result<()> {
    let staging = staging_path(target);
    let installed = fs::copy(candidate, &staging).and_then(|_| fs::rename(&staging, target));
    match installed {
        Ok(()) => {
            remove_quietly(candidate);
            Ok(())
        }
        Err(e) => {
            remove_quietly(&staging);
            Err(Error::Replace {
                path: target.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Remove a staging file left behind by a replace that was interrupted
/// before its final rename. The original is still in place in that case.
pub fn remove_stale_staging(target: &Path) {
    let staging = staging_path(target);
    if staging.is_file() {
        debug!(staging = ?staging, "Removing stale staging file");
        remove_quietly(&staging);
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(?path, error = %e, "Could not remove file"),
    }
}
