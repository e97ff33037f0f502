pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod lock;
pub mod notify;
pub mod platform;
pub mod power;
pub mod progress;
pub mod quarantine;
pub mod scanner;
pub mod scheduler;

pub use config::AppConfig;
pub use detection::{Detection, DetectionEngine, ScanTarget, Verdict};
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use lock::RunLock;
pub use progress::{ProgressReporter, SilentReporter};
pub use quarantine::{Quarantine, QuarantineReport};
