//! Contract with the external malware detection engine.

mod clamd;

pub use clamd::{parse_detections, ClamdScan};

use crate::error::Error;
use std::fmt;
use std::path::PathBuf;

/// What to hand to the detection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Explicit file paths.
    Paths(Vec<PathBuf>),
    /// A text file listing one path per line.
    ListFile(PathBuf),
}

/// A single infected file reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub path: PathBuf,
    pub label: String,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} FOUND", self.path.display(), self.label)
    }
}

/// Outcome of one engine invocation. Engine failures are reported as
/// [`Error::EngineFailure`] instead of a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Infected(Vec<Detection>),
}

impl Verdict {
    pub fn detections(&self) -> &[Detection] {
        match self {
            Verdict::Clean => &[],
            Verdict::Infected(detections) => detections,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Verdict::Clean)
    }
}

pub trait DetectionEngine {
    fn scan(&self, target: &ScanTarget) -> Result<Verdict, Error>;
}

impl<D: DetectionEngine + ?Sized> DetectionEngine for Box<D> {
    fn scan(&self, target: &ScanTarget) -> Result<Verdict, Error> {
        (**self).scan(target)
    }
}

impl<D: DetectionEngine + ?Sized> DetectionEngine for &D {
    fn scan(&self, target: &ScanTarget) -> Result<Verdict, Error> {
        (**self).scan(target)
    }
}
