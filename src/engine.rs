use crate::detection::{Detection, DetectionEngine, ScanTarget, Verdict};
use crate::error::Error;
use crate::notify::{Notification, Notifier};
use crate::platform;
use crate::progress::ProgressReporter;
use crate::quarantine::{Quarantine, QuarantineReport};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Submits scan targets to the detection engine and quarantines whatever it reports.
pub struct ScanEngine<D, N> {
    detector: D,
    notifier: N,
    quarantine: Quarantine,
}

#[derive(Debug)]
pub struct ScanResult {
    pub verdict: Verdict,
    pub quarantine: QuarantineReport,
    pub scan_duration: Duration,
}

impl ScanResult {
    pub fn detections(&self) -> usize {
        self.verdict.detections().len()
    }
}

impl<D: DetectionEngine, N: Notifier> ScanEngine<D, N> {
    pub fn new(detector: D, notifier: N, quarantine: Quarantine) -> Self {
        Self {
            detector,
            notifier,
            quarantine,
        }
    }

    pub fn quarantine_root(&self) -> &Path {
        self.quarantine.root()
    }

    /// Run the detection engine only. An engine failure is returned as an error.
    pub fn submit(&self, target: &ScanTarget) -> Result<Verdict, Error> {
        self.detector.scan(target)
    }

    /// Full pass over one target:
    /// 1. Submit to the detection engine
    /// 2. Quarantine every reported file
    /// 3. Notify the user about the infections
    pub fn scan(
        &self,
        target: &ScanTarget,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        let file_count = match target {
            ScanTarget::Paths(paths) => Some(paths.len()),
            ScanTarget::ListFile(_) => None,
        };
        reporter.on_submit_start(file_count);

        let start = Instant::now();
        let verdict = self.submit(target)?;
        let scan_duration = start.elapsed();
        reporter.on_submit_complete(verdict.detections().len(), scan_duration.as_secs_f64());

        let quarantine = self.handle_verdict(&verdict, reporter);

        Ok(ScanResult {
            verdict,
            quarantine,
            scan_duration,
        })
    }

    /// Scan explicit paths. Anything that is not an existing regular file is dropped
    /// first, symlinks included, so a link is never moved in place of its target.
    /// Returns `None` without invoking the engine when nothing is left.
    pub fn scan_paths<I>(
        &self,
        paths: I,
        reporter: &dyn ProgressReporter,
    ) -> Result<Option<ScanResult>, Error>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let files: Vec<PathBuf> = paths
            .into_iter()
            .filter(|path| {
                let keep = platform::is_regular_file(path);
                if !keep {
                    info!("Not a regular file, skipping: {}", path.display());
                }
                keep
            })
            .collect();

        if files.is_empty() {
            debug!("No regular files to scan");
            return Ok(None);
        }

        self.scan(&ScanTarget::Paths(files), reporter).map(Some)
    }

    pub fn scan_file_list(
        &self,
        list: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        self.scan(&ScanTarget::ListFile(list.to_path_buf()), reporter)
    }

    fn handle_verdict(&self, verdict: &Verdict, reporter: &dyn ProgressReporter) -> QuarantineReport {
        let detections = match verdict {
            Verdict::Clean => return QuarantineReport::default(),
            Verdict::Infected(detections) => detections,
        };

        if detections.is_empty() {
            warn!("Engine reported infections but no detection lines could be parsed");
            return QuarantineReport::default();
        }

        info!("{} infected file(s) reported", detections.len());
        let report = self.quarantine.quarantine_all(
            detections.iter().map(|d| d.path.as_path()),
            &self.notifier,
            reporter,
        );
        self.notify_infections(detections);
        report
    }

    fn notify_infections(&self, detections: &[Detection]) {
        let body = detections
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let notification = Notification::new("Infected files", body).with_subtitle(format!(
            "moved to {}",
            self.quarantine.root().display()
        ));
        if let Err(e) = self.notifier.show(&notification) {
            warn!("{}", e);
        }
    }
}
