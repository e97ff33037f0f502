use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "avsweep")]
#[command(about = "Scan files with clamd and quarantine infected files", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the given files and quarantine infected ones
    Scan(ScanArgs),
    /// Run a full scan of one or more directories, subject to power and recency policy
    FullScan(FullScanArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// clamdscan executable, overriding the configured one
    #[arg(long, value_name = "PATH")]
    pub clamdscan_path: Option<String>,

    /// Scan files listed in the given file, one path per line
    #[arg(long, value_name = "FILE")]
    pub file_list: Option<PathBuf>,

    /// Files to scan. Anything that is not a regular file, symlinks included, is ignored
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FullScanArgs {
    /// File storing the scan timestamp
    #[arg(long, value_name = "FILE")]
    pub timestamp_file: PathBuf,

    /// Only run if the last successful scan is older than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub if_last_scan_age: Option<u64>,

    /// Only scan files modified during the last n days
    #[arg(long, value_name = "DAYS")]
    pub modified_last_days: Option<u64>,

    /// Only run when connected to AC power
    #[arg(long)]
    pub require_ac: bool,

    /// clamdscan executable, overriding the configured one
    #[arg(long, value_name = "PATH")]
    pub clamdscan_path: Option<String>,

    /// Directories to scan
    #[arg(required = true)]
    pub basedirs: Vec<PathBuf>,
}
