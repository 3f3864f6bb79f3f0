//! Recursive discovery of files to crush

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Counters of one walk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Files handed to the handler
    pub matched: usize,
    /// Regular files that did not match the extension
    pub skipped: usize,
    /// Entries that could not be read (permissions, link cycles, ...)
    pub errors: usize,
}

/// Depth-first walker over a source tree.
///
/// Siblings are visited in file-name order, so two runs over an unchanged
/// tree visit files in the same order. Symbolic links are followed.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    extension: String,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check the case-sensitive extension filter against a file name
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.as_encoded_bytes().ends_with(self.extension.as_bytes()))
    }

    /// Walk the tree, calling `handler(path, depth)` once per matching file.
    ///
    /// Fails with [`Error::RootNotFound`] before visiting anything when the
    /// root is missing or not a directory. Errors on individual entries are
    /// logged and counted, and the walk continues.
    pub fn walk<F>(&self, mut handler: F) -> Result<WalkStats>
    where
        F: FnMut(&Path, usize),
    {
        if !self.root.is_dir() {
            return Err(Error::RootNotFound {
                path: self.root.clone(),
            });
        }

        let mut stats = WalkStats::default();

        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(Error::WalkDir(e));
                    }
                    warn!(
                        path = ?e.path(),
                        loop_ancestor = ?e.loop_ancestor(),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    stats.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if self.matches(entry.path()) {
                trace!(path = ?entry.path(), depth = entry.depth(), "Matched file");
                stats.matched += 1;
                handler(entry.path(), entry.depth());
            } else {
                stats.skipped += 1;
            }
        }

        debug!(
            root = ?self.root,
            matched = stats.matched,
            skipped = stats.skipped,
            errors = stats.errors,
            "Walk finished"
        );

        Ok(stats)
    }
}

/// Path of `path` relative to `root`, always using `/` as separator
pub fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
