use glob::Pattern;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

/// Restrictions applied while enumerating candidate files.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    /// Only keep files modified less than this long ago.
    pub modified_within: Option<Duration>,
    pub exclude: Vec<Pattern>,
}

impl CandidateFilter {
    pub fn new(modified_within: Option<Duration>, exclude_globs: &[String]) -> Self {
        let exclude = exclude_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            modified_within,
            exclude,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|pattern| pattern.matches_path(path))
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn modified_within(entry: &DirEntry, window: Duration, now: SystemTime) -> bool {
    let modified = match entry
        .metadata()
        .map_err(io::Error::from)
        .and_then(|m| m.modified())
    {
        Ok(modified) => modified,
        Err(err) => {
            debug!("No modification time for {}: {}", entry.path().display(), err);
            return false;
        }
    };
    match now.duration_since(modified) {
        Ok(age) => age < window,
        // Modified "in the future" (clock skew) counts as recent.
        Err(_) => true,
    }
}

/// Lazily walk `base_dir` and yield absolute paths of regular, non-empty files.
///
/// Symlinks are not followed. Unreadable subtrees and entries that vanish mid-walk
/// are skipped, so the result may be partial but the walk itself never fails.
pub fn enumerate_candidates(
    base_dir: &Path,
    filter: &CandidateFilter,
) -> impl Iterator<Item = PathBuf> {
    let root = absolute(base_dir);
    if !root.is_dir() {
        warn!("Scan directory {} is not a directory", root.display());
    }

    let now = SystemTime::now();
    let filter = filter.clone();
    let entry_filter = filter.clone();

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !entry_filter.is_excluded(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(move |entry| {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                return false;
            }
            match filter.modified_within {
                Some(window) => modified_within(entry, window, now),
                None => true,
            }
        })
        .map(DirEntry::into_path)
}
