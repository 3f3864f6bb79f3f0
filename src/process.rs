//! Run driver: walks the source tree and crushes every match in order
//!
//! Handles:
//! - Checking the source root before anything is touched
//! - Crushing files one at a time, in traversal order
//! - Logging one result line per file
//! - Collecting outcomes and counters into a [`RunReport`]

use crate::config::RunConfig;
use crate::crush::{Crusher, Disposition, FileOutcome};
use crate::error::Result;
use crate::launcher::{ProcessLauncher, ToolLauncher};
use crate::walker::TreeWalker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, span};

/// Counters of one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub already_optimal: usize,
    pub can_be_optimized: usize,
    pub optimized: usize,
    pub failed: usize,
    /// Entries the walker could not read
    pub walk_errors: usize,
    /// Bytes removed from disk
    pub bytes_saved: u64,
    /// Bytes that could be removed (dry run included)
    pub potential_savings: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.total += 1;
        match outcome.disposition {
            Disposition::AlreadyOptimal => self.already_optimal += 1,
            Disposition::CanBeOptimized => self.can_be_optimized += 1,
            Disposition::Optimized => self.optimized += 1,
            Disposition::Failed => self.failed += 1,
        }
        self.bytes_saved += outcome.bytes_saved();
        self.potential_savings += outcome.potential_savings();
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Already optimal: {}, Can be optimized: {}, Optimized: {}, Failed: {}",
            self.total, self.already_optimal, self.can_be_optimized, self.optimized, self.failed
        )
    }
}

/// Everything a run produced, in traversal order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub source_root: PathBuf,
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
    pub stats: RunStats,
}

impl RunReport {
    fn new(config: &RunConfig) -> Self {
        Self {
            started_at: Utc::now(),
            source_root: config.source_root.clone(),
            dry_run: config.dry_run,
            outcomes: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Result lines (`"<file>: <line>"`) in traversal order
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|o| format!("{}: {}", o.relative_path, o))
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == Disposition::Failed)
    }

    /// Write the report as pretty JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Main processor for one crushing run
pub struct Processor<L = ProcessLauncher> {
    crusher: Crusher<L>,
}

impl Processor<ProcessLauncher> {
    /// Create a processor that launches the real tool
    pub fn new(config: RunConfig) -> Self {
        Self::with_launcher(config, ProcessLauncher)
    }
}

impl<L: ToolLauncher> Processor<L> {
    pub fn with_launcher(config: RunConfig, launcher: L) -> Self {
        Self {
            crusher: Crusher::new(config, launcher),
        }
    }

    pub fn config(&self) -> &RunConfig {
        self.crusher.config()
    }

    /// Walk the source root and crush every matching file.
    ///
    /// Only a root that cannot be walked is an error; per-file problems end
    /// up as `Failed` outcomes in the report.
    pub fn run(&self) -> Result<RunReport> {
        let config = self.crusher.config();
        let _span = span!(Level::INFO, "run", root = %config.source_root.display()).entered();

        info!(
            dry_run = config.dry_run,
            tool = %config.tool_path,
            "Scanning source directory..."
        );

        let mut report = RunReport::new(config);
        let walker = TreeWalker::new(&config.source_root, &config.extension);

        let walk = walker.walk(|path, depth| {
            let outcome = self.crusher.crush(path);
            match outcome.disposition {
                Disposition::Failed => {
                    error!(file = %outcome.relative_path, depth, "{}", outcome)
                }
                _ => info!(file = %outcome.relative_path, depth, "{}", outcome),
            }
            report.stats.record(&outcome);
            report.outcomes.push(outcome);
        });

        match walk {
            Ok(walk_stats) => {
                report.stats.walk_errors = walk_stats.errors;
                info!("{}", report.stats.summary());
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Walk the directory tree failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::launcher::ToolExit;
    use crate::os::{CommandStyle, Invocation};
    use std::fs;
    use std::io;
    use tempfile::{TempDir, tempdir};

    /// Halves every file (rounding down), refusing files named `bad.png`
    struct HalvingTool;

    impl ToolLauncher for HalvingTool {
        fn launch(&self, invocation: &Invocation) -> io::Result<ToolExit> {
            let n = invocation.args.len();
            let source = PathBuf::from(&invocation.args[n - 2]);
            let dest = PathBuf::from(&invocation.args[n - 1]);
            if source.file_name().is_some_and(|f| f == "bad.png") {
                return Ok(ToolExit::failed(2));
            }
            let data = fs::read(&source)?;
            fs::write(dest, &data[..data.len() / 2])?;
            Ok(ToolExit::ok())
        }
    }

    fn setup(dry_run: bool) -> (TempDir, RunConfig) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        let temp = dir.path().join("tmp");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&temp).unwrap();
        let config = RunConfig {
            dry_run,
            temp_dir: temp,
            command_style: CommandStyle::Direct,
            ..RunConfig::new(root, "halve")
        };
        (dir, config)
    }

    #[test]
    fn test_empty_tree_succeeds_without_lines() {
        let (_dir, config) = setup(false);
        let report = Processor::with_launcher(config, HalvingTool).run().unwrap();
        assert!(report.lines().is_empty());
        assert_eq!(report.stats, RunStats::default());
    }

    #[test]
    fn test_missing_root_fails_without_lines() {
        let (_dir, mut config) = setup(false);
        config.source_root = config.source_root.join("missing");
        let err = Processor::with_launcher(config, HalvingTool).run().unwrap_err();
        assert!(matches!(err, Error::RootNotFound { .. }));
    }

    #[test]
    fn test_run_collects_outcomes_in_order() {
        let (_dir, config) = setup(false);
        let root = config.source_root.clone();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/b.png"), vec![1u8; 200]).unwrap();
        fs::write(root.join("a.png"), vec![1u8; 1000]).unwrap();
        fs::write(root.join("bad.png"), vec![1u8; 50]).unwrap();
        fs::write(root.join("notes.txt"), vec![1u8; 50]).unwrap();
        fs::write(root.join("zero.png"), b"").unwrap();

        let report = Processor::with_launcher(config, HalvingTool).run().unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "a.png: 1000 => 500, 50%  => was optimized !!!".to_string(),
                "bad.png: failed: halve exited with status 2".to_string(),
                "nested/b.png: 200 => 100, 50%  => was optimized !!!".to_string(),
                "zero.png: 0 => 0, 100%  => OK ".to_string(),
            ]
        );
        assert_eq!(report.stats.total, 4);
        assert_eq!(report.stats.optimized, 2);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.already_optimal, 1);
        assert_eq!(report.stats.bytes_saved, 600);
        assert_eq!(report.failures().count(), 1);

        assert_eq!(fs::metadata(root.join("a.png")).unwrap().len(), 500);
        assert_eq!(fs::metadata(root.join("bad.png")).unwrap().len(), 50);
        assert_eq!(fs::metadata(root.join("notes.txt")).unwrap().len(), 50);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let (_dir, config) = setup(true);
        let root = config.source_root.clone();
        let temp = config.temp_dir.clone();
        fs::write(root.join("a.png"), vec![7u8; 1000]).unwrap();

        let report = Processor::with_launcher(config, HalvingTool).run().unwrap();

        assert_eq!(
            report.lines(),
            vec!["a.png: 1000 => 500, 50%  => can be optimized !!!".to_string()]
        );
        assert_eq!(report.stats.potential_savings, 500);
        assert_eq!(report.stats.bytes_saved, 0);
        assert_eq!(fs::read(root.join("a.png")).unwrap(), vec![7u8; 1000]);
        assert!(fs::read_dir(temp).unwrap().next().is_none());
    }

    #[test]
    fn test_report_json_roundtrip() {
        let (dir, config) = setup(true);
        fs::write(config.source_root.join("a.png"), vec![1u8; 10]).unwrap();
        let report = Processor::with_launcher(config, HalvingTool).run().unwrap();

        let path = dir.path().join("out/report.json");
        report.save_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["outcomes"][0]["relative_path"], "a.png");
        assert_eq!(json["outcomes"][0]["disposition"], "can_be_optimized");
        assert_eq!(json["stats"]["can_be_optimized"], 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_real_tool_process() {
        let (_dir, mut config) = setup(false);
        let root = config.source_root.clone();
        // sh -c SCRIPT SOURCE DEST: the paths arrive as $0 and $1
        config.tool_path = "sh".into();
        config.extra_args = vec![
            "-c".into(),
            r#"case "$0" in *b.png) cat "$0" > "$1" ;; *) head -c 600 "$0" > "$1" ;; esac"#.into(),
        ];
        fs::write(root.join("a.png"), vec![3u8; 1000]).unwrap();
        fs::write(root.join("b.png"), vec![4u8; 1000]).unwrap();

        let report = Processor::new(config).run().unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "a.png: 1000 => 600, 60%  => was optimized !!!".to_string(),
                "b.png: 1000 => 1000, 100%  => OK ".to_string(),
            ]
        );
        assert_eq!(fs::read(root.join("a.png")).unwrap(), vec![3u8; 600]);
        assert_eq!(fs::read(root.join("b.png")).unwrap(), vec![4u8; 1000]);
    }

    #[test]
    fn test_stats_summary() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome {
            relative_path: "a.png".into(),
            original_size: 10,
            new_size: Some(4),
            disposition: Disposition::Optimized,
            error: None,
        });
        let summary = stats.summary();
        assert!(summary.contains("Total: 1"));
        assert!(summary.contains("Optimized: 1"));
        assert_eq!(stats.bytes_saved, 6);
    }
}
