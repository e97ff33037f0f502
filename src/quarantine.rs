//! Relocation of infected files into the quarantine root.
//!
//! Precondition: a single process mutates the quarantine root at a time. The
//! free-name search below is read-then-act and is only safe under the run lock.

use crate::notify::{Notification, Notifier};
use crate::platform;
use crate::progress::ProgressReporter;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedFile {
    pub original: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug)]
pub struct QuarantineFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

#[derive(Debug, Default)]
pub struct QuarantineReport {
    pub quarantined: Vec<QuarantinedFile>,
    pub failed: Vec<QuarantineFailure>,
}

#[derive(Debug, Clone)]
pub struct Quarantine {
    root: PathBuf,
}

/// Name for `path` inside `root` with the given collision suffix.
/// Suffix 0 keeps the original name; `n > 0` inserts `.n` between stem and extension.
pub fn candidate_name(root: &Path, path: &Path, suffix: u32) -> Option<PathBuf> {
    let mut name = path.file_stem()?.to_os_string();
    if suffix > 0 {
        name.push(format!(".{}", suffix));
    }
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    Some(root.join(name))
}

fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

impl Quarantine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free destination for `path`, given the current directory listing.
    pub fn destination_for(&self, path: &Path) -> Option<PathBuf> {
        path.file_name()?;
        (0..=u32::MAX)
            .filter_map(|suffix| candidate_name(&self.root, path, suffix))
            .find(|candidate| !exists_no_follow(candidate))
    }

    fn ensure_root(&self) -> io::Result<()> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root)?;
            info!("Created quarantine directory {}", self.root.display());
        }
        Ok(())
    }

    /// Move one file into quarantine and make it owner read-only.
    pub fn quarantine_file(&self, path: &Path) -> io::Result<PathBuf> {
        let destination = self.destination_for(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in {}", path.display()),
            )
        })?;

        fs::rename(path, &destination)?;
        platform::make_owner_read_only(&destination)?;
        Ok(destination)
    }

    /// Quarantine every path once. A failing file is reported through `notifier`
    /// and never stops the remaining files.
    pub fn quarantine_all<'a, I, N>(
        &self,
        paths: I,
        notifier: &N,
        reporter: &dyn ProgressReporter,
    ) -> QuarantineReport
    where
        I: IntoIterator<Item = &'a Path>,
        N: Notifier + ?Sized,
    {
        let mut report = QuarantineReport::default();

        if let Err(e) = self.ensure_root() {
            error!(
                "Cannot create quarantine directory {}: {}",
                self.root.display(),
                e
            );
        }

        let mut seen: HashSet<&Path> = HashSet::new();
        for path in paths {
            if !seen.insert(path) {
                debug!("Skipping repeated detection for {}", path.display());
                continue;
            }

            match self.quarantine_file(path) {
                Ok(destination) => {
                    info!(
                        "Quarantined {} -> {}",
                        path.display(),
                        destination.display()
                    );
                    reporter.on_file_quarantined(path, &destination);
                    report.quarantined.push(QuarantinedFile {
                        original: path.to_path_buf(),
                        destination,
                    });
                }
                Err(e) => {
                    error!("Failed to quarantine '{}': {}", path.display(), e);
                    reporter.on_quarantine_failed(path);
                    let notification = Notification::new(
                        "Failed to quarantine",
                        format!("Failed to quarantine infected file {}.", path.display()),
                    );
                    if let Err(notify_err) = notifier.show(&notification) {
                        warn!("{}", notify_err);
                    }
                    report.failed.push(QuarantineFailure {
                        path: path.to_path_buf(),
                        error: e,
                    });
                }
            }
        }

        report
    }
}
