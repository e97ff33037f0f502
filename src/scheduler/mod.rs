//! Decides whether a full scan runs now, then drives it directory by directory.

pub mod marker;

pub use marker::{FileMarkerStore, MarkerStore, MemoryMarkerStore};

use crate::config;
use crate::detection::DetectionEngine;
use crate::engine::{ScanEngine, ScanResult};
use crate::error::Error;
use crate::notify::Notifier;
use crate::platform;
use crate::power::PowerSource;
use crate::progress::ProgressReporter;
use crate::scanner::{enumerate_candidates, CandidateFilter};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Reports enumeration progress every this many files.
const PROGRESS_INTERVAL: usize = 1_000;

#[derive(Debug, Clone, Default)]
pub struct ScanPolicy {
    pub require_mains_power: bool,
    /// Skip when the last successful run started less than this long ago.
    pub min_interval: Option<chrono::Duration>,
    /// Only scan files modified within this window.
    pub modified_within: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    OnBattery,
    RecentRun { last_run: DateTime<Utc> },
    AlreadyRunning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OnBattery => write!(f, "not on AC power"),
            SkipReason::RecentRun { last_run } => {
                write!(f, "last scan at {} is still recent", last_run.to_rfc3339())
            }
            SkipReason::AlreadyRunning => write!(f, "another scan is already running"),
        }
    }
}

#[derive(Debug)]
pub struct DirectorySummary {
    pub base_dir: PathBuf,
    pub candidates: usize,
    /// `None` when the directory had no candidates and the engine was not invoked.
    pub result: Option<ScanResult>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub directories: Vec<DirectorySummary>,
}

impl RunSummary {
    pub fn files_scanned(&self) -> usize {
        self.directories.iter().map(|d| d.candidates).sum()
    }

    pub fn detections(&self) -> usize {
        self.results().map(ScanResult::detections).sum()
    }

    pub fn quarantined(&self) -> usize {
        self.results().map(|r| r.quarantine.quarantined.len()).sum()
    }

    pub fn quarantine_failures(&self) -> usize {
        self.results().map(|r| r.quarantine.failed.len()).sum()
    }

    fn results(&self) -> impl Iterator<Item = &ScanResult> {
        self.directories.iter().filter_map(|d| d.result.as_ref())
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Completed(RunSummary),
}

pub struct Scheduler<P, M> {
    power: P,
    marker: M,
    exclude_patterns: Vec<String>,
}

impl<P: PowerSource, M: MarkerStore> Scheduler<P, M> {
    pub fn new(power: P, marker: M) -> Self {
        Self {
            power,
            marker,
            exclude_patterns: Vec::new(),
        }
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Why the run should be skipped at `now`, if at all. Reads state only.
    pub fn skip_reason(
        &self,
        policy: &ScanPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<SkipReason>, Error> {
        if policy.require_mains_power && !self.power.is_on_mains_power()? {
            return Ok(Some(SkipReason::OnBattery));
        }

        if let Some(min_interval) = policy.min_interval {
            if let Some(last_run) = self.marker.read()? {
                let still_recent = last_run
                    .checked_add_signed(min_interval)
                    .map_or(true, |due| due > now);
                if still_recent {
                    return Ok(Some(SkipReason::RecentRun { last_run }));
                }
            }
        }

        Ok(None)
    }

    pub fn should_run(&self, policy: &ScanPolicy, now: DateTime<Utc>) -> Result<bool, Error> {
        Ok(self.skip_reason(policy, now)?.is_none())
    }

    /// Record `at` as the start of the last successful run.
    pub fn mark_run_complete(&self, at: DateTime<Utc>) -> Result<(), Error> {
        self.marker.write(at)
    }

    pub fn run<D, N>(
        &self,
        engine: &ScanEngine<D, N>,
        policy: &ScanPolicy,
        base_dirs: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome, Error>
    where
        D: DetectionEngine,
        N: Notifier,
    {
        self.run_at(engine, policy, base_dirs, reporter, Utc::now())
    }

    /// Full run as of `started_at`:
    /// 1. Policy checks (power, recency), before any filesystem work
    /// 2. Per base directory: enumerate candidates, scan, quarantine
    /// 3. Persist `started_at` once every directory completed
    ///
    /// A fatal error in any directory aborts the run and leaves the marker untouched.
    pub fn run_at<D, N>(
        &self,
        engine: &ScanEngine<D, N>,
        policy: &ScanPolicy,
        base_dirs: &[PathBuf],
        reporter: &dyn ProgressReporter,
        started_at: DateTime<Utc>,
    ) -> Result<RunOutcome, Error>
    where
        D: DetectionEngine,
        N: Notifier,
    {
        if let Some(reason) = self.skip_reason(policy, started_at)? {
            info!("Skipping scan: {}", reason);
            return Ok(RunOutcome::Skipped(reason));
        }

        let base_dirs = config::non_overlapping_directories(base_dirs.to_vec());
        info!("Scanning directories: {:?}", base_dirs);

        let filter = CandidateFilter::new(policy.modified_within, &self.exclude_patterns);
        let mut directories = Vec::with_capacity(base_dirs.len());
        for base_dir in base_dirs {
            let summary = scan_directory(engine, &base_dir, &filter, reporter)?;
            directories.push(summary);
        }

        self.mark_run_complete(started_at)?;
        debug!("Recorded successful run at {}", started_at.to_rfc3339());

        Ok(RunOutcome::Completed(RunSummary {
            started_at,
            directories,
        }))
    }
}

/// Stream the candidates of one directory into a temporary list file and hand it to the engine.
fn scan_directory<D, N>(
    engine: &ScanEngine<D, N>,
    base_dir: &Path,
    filter: &CandidateFilter,
    reporter: &dyn ProgressReporter,
) -> Result<DirectorySummary, Error>
where
    D: DetectionEngine,
    N: Notifier,
{
    reporter.on_enumerate_start(base_dir);
    let enumerate_start = Instant::now();

    let list = NamedTempFile::new()?;
    let mut candidates = 0usize;
    {
        let mut writer = BufWriter::new(list.as_file());
        for path in enumerate_candidates(base_dir, filter) {
            writer.write_all(&platform::path_bytes(&path))?;
            writer.write_all(b"\n")?;
            candidates += 1;
            if candidates % PROGRESS_INTERVAL == 0 {
                reporter.on_enumerate_progress(candidates);
            }
        }
        writer.flush()?;
    }

    let enumerate_duration = enumerate_start.elapsed();
    reporter.on_enumerate_complete(candidates, enumerate_duration.as_secs_f64());
    debug!(
        "Enumerated {} candidates under {} in {:.2}s",
        candidates,
        base_dir.display(),
        enumerate_duration.as_secs_f64()
    );

    if candidates == 0 {
        info!("No files to scan under {}", base_dir.display());
        return Ok(DirectorySummary {
            base_dir: base_dir.to_path_buf(),
            candidates,
            result: None,
        });
    }

    let result = engine.scan_file_list(list.path(), reporter)?;
    Ok(DirectorySummary {
        base_dir: base_dir.to_path_buf(),
        candidates,
        result: Some(result),
    })
}
