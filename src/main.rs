mod cli;
mod logging;
mod reporter;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use avsweep::detection::ClamdScan;
use avsweep::notify::{self, Notifier};
use avsweep::scheduler::{FileMarkerStore, RunOutcome, ScanPolicy, Scheduler, SkipReason};
use avsweep::{platform, power, AppConfig, Quarantine, RunLock, ScanEngine, ScanResult};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, FullScanArgs, ScanArgs};
use colored::*;
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{debug, error, info};

/// Largest interval chrono can represent, in whole seconds.
const MAX_INTERVAL_SECS: u64 = (i64::MAX / 1_000) as u64;

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match avsweep::config::load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    debug!("config: {:?}", config);

    let result = match args.command {
        Some(Commands::Scan(scan_args)) => run_scan(&config, scan_args),
        Some(Commands::FullScan(full_scan_args)) => run_full_scan(&config, full_scan_args),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn build_engine(config: &AppConfig) -> ScanEngine<ClamdScan, Box<dyn Notifier>> {
    let detector = ClamdScan::new(config.clamdscan_path.clone(), config.clamdscan_args.clone());
    ScanEngine::new(
        detector,
        notify::platform_default(),
        Quarantine::new(config.quarantine_root()),
    )
}

fn run_scan(config: &AppConfig, args: ScanArgs) -> anyhow::Result<()> {
    let config = &config.clone().with_clamdscan_path(args.clamdscan_path);
    let lock_path = config.lock_path();
    let _lock = RunLock::acquire(&lock_path)
        .with_context(|| format!("Cannot lock {}", lock_path.display()))?;

    let engine = build_engine(config);
    let reporter = CliReporter::new();

    if let Some(list) = &args.file_list {
        let list = platform::expand_home(list);
        let result = engine
            .scan_file_list(&list, &reporter)
            .with_context(|| format!("Scanning files listed in {}", list.display()))?;
        print_scan_result(&engine, &result);
    }

    if !args.files.is_empty() {
        if let Some(result) = engine.scan_paths(args.files, &reporter)? {
            print_scan_result(&engine, &result);
        }
    }

    Ok(())
}

fn run_full_scan(config: &AppConfig, args: FullScanArgs) -> anyhow::Result<()> {
    let config = &config.clone().with_clamdscan_path(args.clamdscan_path.clone());
    let lock_path = config.lock_path();
    let _lock = match RunLock::try_acquire(&lock_path)
        .with_context(|| format!("Cannot lock {}", lock_path.display()))?
    {
        Some(lock) => lock,
        None => {
            info!("Skipping scan: {}", SkipReason::AlreadyRunning);
            return Ok(());
        }
    };

    let policy = ScanPolicy {
        require_mains_power: args.require_ac,
        min_interval: args
            .if_last_scan_age
            .map(|secs| chrono::Duration::seconds(secs.min(MAX_INTERVAL_SECS) as i64)),
        modified_within: args
            .modified_last_days
            .map(|days| std::time::Duration::from_secs(days.saturating_mul(86_400))),
    };
    let base_dirs: Vec<PathBuf> = args
        .basedirs
        .iter()
        .map(|dir| platform::expand_home(dir))
        .collect();

    let marker = FileMarkerStore::new(platform::expand_home(&args.timestamp_file));
    let scheduler = Scheduler::new(power::platform_default(), marker)
        .with_exclude_patterns(config.exclude_patterns.clone());
    let engine = build_engine(config);
    let reporter = CliReporter::new();

    match scheduler.run(&engine, &policy, &base_dirs, &reporter)? {
        RunOutcome::Skipped(reason) => {
            println!("Skipping scan: {}", reason);
        }
        RunOutcome::Completed(summary) => {
            println!();
            info!(
                "Scanned {} files in {} directories",
                format!("{}", summary.files_scanned()).green(),
                format!("{}", summary.directories.len()).green(),
            );
            if summary.detections() > 0 {
                info!(
                    "{} infected, {} quarantined to {}, {} failed",
                    format!("{}", summary.detections()).red(),
                    format!("{}", summary.quarantined()).yellow(),
                    engine.quarantine_root().display(),
                    format!("{}", summary.quarantine_failures()).red(),
                );
            }
        }
    }

    Ok(())
}

fn print_scan_result<D, N>(engine: &ScanEngine<D, N>, result: &ScanResult)
where
    D: avsweep::detection::DetectionEngine,
    N: Notifier,
{
    if result.verdict.is_clean() {
        info!(
            "No infections found ({})",
            format!("{:.2}s", result.scan_duration.as_secs_f64()).green()
        );
        return;
    }

    for detection in result.verdict.detections() {
        println!("{}", detection.to_string().red());
    }
    info!(
        "{} quarantined to {}, {} failed",
        format!("{}", result.quarantine.quarantined.len()).yellow(),
        engine.quarantine_root().display(),
        format!("{}", result.quarantine.failed.len()).red(),
    );
}
