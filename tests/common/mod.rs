#![allow(dead_code)]

use avsweep::notify::{Notification, Notifier};
use avsweep::platform;
use avsweep::power::PowerSource;
use avsweep::{Detection, DetectionEngine, Error, ScanTarget, Verdict};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Canned answer for one engine invocation.
#[derive(Debug, Clone)]
pub enum Response {
    Clean,
    Infected(Vec<PathBuf>),
    Fail(i32),
}

/// Detection engine double. Answers from a queue (clean once empty) and records
/// the paths of every submission, reading list files at call time.
#[derive(Default)]
pub struct FakeEngine {
    responses: RefCell<VecDeque<Response>>,
    submissions: RefCell<Vec<Vec<PathBuf>>>,
}

impl FakeEngine {
    pub fn new(responses: Vec<Response>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            submissions: RefCell::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<Vec<PathBuf>> {
        self.submissions.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.submissions.borrow().len()
    }
}

impl DetectionEngine for FakeEngine {
    fn scan(&self, target: &ScanTarget) -> Result<Verdict, Error> {
        let paths = match target {
            ScanTarget::Paths(paths) => paths.clone(),
            ScanTarget::ListFile(list) => fs::read(list)?
                .split(|&b| b == b'\n')
                .filter(|line| !line.is_empty())
                .map(platform::path_from_bytes)
                .collect(),
        };
        self.submissions.borrow_mut().push(paths);

        match self.responses.borrow_mut().pop_front().unwrap_or(Response::Clean) {
            Response::Clean => Ok(Verdict::Clean),
            Response::Infected(paths) => Ok(Verdict::Infected(
                paths
                    .into_iter()
                    .map(|path| Detection {
                        path,
                        label: "Eicar-Signature".to_string(),
                    })
                    .collect(),
            )),
            Response::Fail(code) => Err(Error::EngineFailure {
                code: Some(code),
                stderr: "engine crashed".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.borrow().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.shown.borrow().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        self.shown.borrow_mut().push(notification.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn show(&self, _notification: &Notification) -> Result<(), Error> {
        Err(Error::Notify("no display".to_string()))
    }
}

pub struct FixedPower(pub bool);

impl PowerSource for FixedPower {
    fn is_on_mains_power(&self) -> Result<bool, Error> {
        Ok(self.0)
    }
}

pub fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    path.to_path_buf()
}

/// Sorted file names directly inside `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Permission bits of `path`.
#[cfg(unix)]
pub fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(unix)]
pub fn assert_owner_read_only(path: &Path) {
    assert_eq!(mode(path), 0o400);
}

/// Directory named by raw, non-UTF-8 bytes. Skipped where the filesystem refuses such names.
#[cfg(unix)]
pub fn non_utf8_dir(parent: &Path, name: &[u8]) -> Option<PathBuf> {
    let dir = parent.join(platform::path_from_bytes(name));
    fs::create_dir_all(&dir).ok().map(|_| dir)
}

#[cfg(not(unix))]
pub fn assert_owner_read_only(path: &Path) {
    assert!(fs::metadata(path).unwrap().permissions().readonly());
}
