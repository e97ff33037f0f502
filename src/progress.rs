use std::path::Path;

/// Trait for reporting run progress.
///
/// CLI implements with indicatif spinners. All methods have default no-op implementations.
pub trait ProgressReporter {
    fn on_enumerate_start(&self, _base_dir: &Path) {}
    fn on_enumerate_progress(&self, _files_found: usize) {}
    fn on_enumerate_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_submit_start(&self, _file_count: Option<usize>) {}
    fn on_submit_complete(&self, _detections: usize, _duration_secs: f64) {}
    fn on_file_quarantined(&self, _original: &Path, _destination: &Path) {}
    fn on_quarantine_failed(&self, _path: &Path) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
