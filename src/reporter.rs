use avsweep::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

/// CLI progress reporter using indicatif spinners.
///
/// - Enumeration: spinner with running file count
/// - Engine submission: spinner (clamd gives no progress)
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: RefCell::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Some(old) = self.bar.borrow_mut().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    fn println(&self, line: String) {
        match self.bar.borrow().as_ref() {
            Some(pb) => pb.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_enumerate_start(&self, base_dir: &Path) {
        self.set_bar(spinner(format!("Collecting files in {}...", base_dir.display())));
    }

    fn on_enumerate_progress(&self, files_found: usize) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_message(format!("Collecting files... {} found", files_found));
        }
    }

    fn on_enumerate_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Collected {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_submit_start(&self, file_count: Option<usize>) {
        let message = match file_count {
            Some(count) => format!("Scanning {} files...", count),
            None => "Scanning files...".to_string(),
        };
        self.set_bar(spinner(message));
    }

    fn on_submit_complete(&self, detections: usize, duration_secs: f64) {
        self.finish_bar();
        if detections == 0 {
            eprintln!("  \x1b[32m✓\x1b[0m No infections found ({:.2}s)", duration_secs);
        } else {
            eprintln!(
                "  \x1b[31m✗\x1b[0m {} infected files found ({:.2}s)",
                detections, duration_secs
            );
        }
    }

    fn on_file_quarantined(&self, original: &Path, destination: &Path) {
        self.println(format!(
            "    {} -> {}",
            original.display(),
            destination.display()
        ));
    }

    fn on_quarantine_failed(&self, path: &Path) {
        self.println(format!("    \x1b[31mnot quarantined:\x1b[0m {}", path.display()));
    }
}
