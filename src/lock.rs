//! Single-instance guard around a whole run.
//!
//! Uses an advisory `flock(LOCK_EX)` on a lock file. The kernel drops the lock
//! when the descriptor closes, so a crashed run never leaves a stale lock behind.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
}

#[cfg(unix)]
fn flock(file: &File, blocking: bool) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let mut op = libc::LOCK_EX;
    if !blocking {
        op |= libc::LOCK_NB;
    }
    loop {
        // SAFETY: the descriptor is owned by `file` and open for the duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
        if rc == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => return Ok(false),
            _ => return Err(err),
        }
    }
}

// No advisory locking here; single-instance stays a documented precondition.
#[cfg(not(unix))]
fn flock(_file: &File, _blocking: bool) -> io::Result<bool> {
    Ok(true)
}

impl RunLock {
    /// Block until the lock is free.
    pub fn acquire(path: &Path) -> io::Result<RunLock> {
        let file = open_lock_file(path)?;
        flock(&file, true)?;
        debug!("Acquired run lock {}", path.display());
        Ok(RunLock {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock if nobody holds it; `None` when another run is active.
    pub fn try_acquire(path: &Path) -> io::Result<Option<RunLock>> {
        let file = open_lock_file(path)?;
        if !flock(&file, false)? {
            debug!("Run lock {} is held elsewhere", path.display());
            return Ok(None);
        }
        debug!("Acquired run lock {}", path.display());
        Ok(Some(RunLock {
            _file: file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        debug!("Released run lock {}", self.path.display());
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_try_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let first = RunLock::try_acquire(&path).unwrap();
        assert!(first.is_some());
        assert!(RunLock::try_acquire(&path).unwrap().is_none());

        drop(first);
        assert!(RunLock::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_acquire_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/run.lock");
        let lock = RunLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(lock.path(), path.as_path());
    }
}
